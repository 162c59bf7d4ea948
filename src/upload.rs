//! Cover-image uploads stored on local disk and served under `/uploads/`.
use crate::config::Config;
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "avif"];

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static UNSAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_.\-]").unwrap());

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    max_bytes: usize,
    site_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StoredUpload {
    pub name: String,
    pub url: String,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize, site_url: &str) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
            site_url: site_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(&cfg.uploads.dir, cfg.uploads.max_bytes, cfg.site_url())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Write `bytes` as `<unix-millis>-<sanitised name>` and return its public URL.
    #[instrument(skip_all, fields(requested = %requested_name, size = bytes.len()))]
    pub async fn save(&self, requested_name: &str, bytes: &[u8]) -> Result<StoredUpload> {
        if bytes.is_empty() {
            return Err(Error::invalid("file", "empty upload"));
        }
        if bytes.len() > self.max_bytes {
            return Err(Error::invalid(
                "file",
                format!("larger than {} bytes", self.max_bytes),
            ));
        }
        let safe = sanitize_name(requested_name);
        if extension_of(&safe).is_none() {
            return Err(Error::invalid(
                "filename",
                format!("must end in one of {}", ALLOWED_EXTENSIONS.join(", ")),
            ));
        }

        let name = format!("{}-{}", chrono::Utc::now().timestamp_millis(), safe);
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&name), bytes).await?;
        let url = format!("{}/uploads/{}", self.site_url, name);
        info!(%name, "stored upload");
        Ok(StoredUpload { name, url })
    }

    /// Bytes and content type of a previously stored file, `None` when the
    /// name is not one this store could have produced or the file is gone.
    pub async fn read(&self, name: &str) -> Result<Option<(Vec<u8>, &'static str)>> {
        if !is_stored_name(name) {
            return Ok(None);
        }
        match tokio::fs::read(self.dir.join(name)).await {
            Ok(bytes) => Ok(Some((bytes, content_type(name)))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// Whitespace becomes `-`, anything outside `[A-Za-z0-9_.-]` is dropped,
/// result is lowercased.
pub fn sanitize_name(raw: &str) -> String {
    let dashed = WHITESPACE.replace_all(raw.trim(), "-");
    UNSAFE.replace_all(&dashed, "").to_lowercase()
}

fn extension_of(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    ALLOWED_EXTENSIONS.contains(&ext).then_some(ext)
}

fn is_stored_name(name: &str) -> bool {
    !name.starts_with('.') && sanitize_name(name) == name && extension_of(name).is_some()
}

pub fn content_type(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "gif" => "image/gif",
        Some(ext) if ext == "webp" => "image/webp",
        Some(ext) if ext == "avif" => "image/avif",
        _ => "application/octet-stream",
    }
}
