//! Configuration loader and validator for the author site.
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub database: Database,
    pub admin: Admin,
    pub uploads: Uploads,
}

/// Site-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    pub bind_addr: String,
    /// Absolute origin used to build public URLs (uploads, canonical links).
    pub site_url: String,
    pub public_list_limit: i64,
}

/// Database connection. An empty `url` means "not configured": public pages
/// render empty and admin writes fail with `Unavailable`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Database {
    #[serde(default)]
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Admin {
    /// Shared secret accepted in `x-admin-password` style headers.
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub session_secret: String,
    #[serde(default)]
    pub secure_cookies: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Uploads {
    pub dir: String,
    pub max_bytes: usize,
}

impl Config {
    /// Ensure required directories exist (`app.data_dir` and `uploads.dir`).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        for dir in [&self.app.data_dir, &self.uploads.dir] {
            if !dir.trim().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        Ok(())
    }

    /// Apply `DATABASE_URL`, `ADMIN_PASSWORD` and `SESSION_SECRET` from the environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(password) = lookup("ADMIN_PASSWORD") {
            self.admin.password = password;
        }
        if let Some(secret) = lookup("SESSION_SECRET") {
            self.admin.session_secret = secret;
        }
    }

    pub fn database_url(&self) -> Option<&str> {
        let url = self.database.url.trim();
        (!url.is_empty()).then_some(url)
    }

    pub fn admin_password(&self) -> Option<&str> {
        let pwd = self.admin.password.trim();
        (!pwd.is_empty()).then_some(pwd)
    }

    /// Secret the session cookie key is derived from: the session secret,
    /// falling back to the shared admin password.
    pub fn session_secret(&self) -> &str {
        let secret = self.admin.session_secret.trim();
        if secret.is_empty() {
            self.admin.password.trim()
        } else {
            secret
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        // Checked in `validate`.
        self.app
            .bind_addr
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 3000)))
    }

    pub fn site_url(&self) -> &str {
        self.app.site_url.trim_end_matches('/')
    }
}

/// Load configuration from a YAML file, apply environment overrides and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let mut cfg: Config = serde_yaml::from_str(&content)?;
    cfg.apply_env();
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.bind_addr.parse::<SocketAddr>().is_err() {
        return Err(ConfigError::Invalid("app.bind_addr must be a socket address"));
    }
    match url::Url::parse(&cfg.app.site_url) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => {}
        _ => return Err(ConfigError::Invalid("app.site_url must be an absolute http(s) URL")),
    }
    if cfg.app.public_list_limit <= 0 {
        return Err(ConfigError::Invalid("app.public_list_limit must be > 0"));
    }

    if cfg.database.max_connections == 0 {
        return Err(ConfigError::Invalid("database.max_connections must be > 0"));
    }

    if cfg.session_secret().is_empty() {
        return Err(ConfigError::Invalid(
            "admin.session_secret or admin.password must be non-empty",
        ));
    }

    if cfg.uploads.dir.trim().is_empty() {
        return Err(ConfigError::Invalid("uploads.dir must be non-empty"));
    }
    if cfg.uploads.max_bytes == 0 {
        return Err(ConfigError::Invalid("uploads.max_bytes must be > 0"));
    }

    Ok(())
}

/// Example YAML content, also used by tests.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  bind_addr: "127.0.0.1:3000"
  site_url: "http://localhost:3000"
  public_list_limit: 50

database:
  url: "sqlite://./data/site.db"
  max_connections: 5

admin:
  password: ""
  session_secret: "CHANGE_ME_TO_A_LONG_RANDOM_STRING"
  secure_cookies: false

uploads:
  dir: "./data/uploads"
  max_bytes: 10485760
"#
}
