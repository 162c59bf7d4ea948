//! Admin auth guard: shared-password headers, signed session cookies and
//! Argon2 password hashes for `admin_user` rows.
use crate::config::Config;
use crate::db::Store;
use crate::error::{Error, Result};
use crate::model::{Access, AdminUser};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::http::{header, HeaderMap};
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::{debug, info, instrument, warn};

pub const SESSION_COOKIE: &str = "author_site_admin_session";
pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

#[derive(Clone)]
pub struct AdminGuard {
    password: Option<String>,
    key: Key,
    secure_cookies: bool,
}

impl fmt::Debug for AdminGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminGuard")
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("secure_cookies", &self.secure_cookies)
            .finish_non_exhaustive()
    }
}

impl AdminGuard {
    pub fn new(password: Option<&str>, session_secret: &str, secure_cookies: bool) -> Self {
        Self {
            password: password.map(str::to_string),
            key: Key::derive_from(&key_material(session_secret)),
            secure_cookies,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            cfg.admin_password(),
            cfg.session_secret(),
            cfg.admin.secure_cookies,
        )
    }

    pub fn key(&self) -> Key {
        self.key.clone()
    }

    pub fn password_matches(&self, candidate: Option<&str>) -> bool {
        match (&self.password, candidate) {
            (Some(expected), Some(given)) => constant_time_eq(
                &Sha256::digest(expected.as_bytes()),
                &Sha256::digest(given.as_bytes()),
            ),
            _ => false,
        }
    }

    /// Admin when the shared password arrives in a header, or when the signed
    /// session cookie names an active admin user. Everything else is public.
    #[instrument(skip_all)]
    pub async fn access(
        &self,
        headers: &HeaderMap,
        jar: &SignedCookieJar,
        store: Option<&Store>,
    ) -> Access {
        if self.password_matches(read_password_header(headers).as_deref()) {
            return Access::Admin;
        }

        let Some(admin_id) = jar
            .get(SESSION_COOKIE)
            .and_then(|c| c.value().parse::<i64>().ok())
        else {
            return Access::Public;
        };
        let Some(store) = store else {
            return Access::Public;
        };
        match store.is_active_admin(admin_id).await {
            Ok(true) => Access::Admin,
            Ok(false) => {
                debug!(admin_id, "session names an unknown or inactive admin");
                Access::Public
            }
            Err(err) => {
                warn!(?err, admin_id, "could not check admin session");
                Access::Public
            }
        }
    }

    pub fn session_cookie(&self, admin_id: i64) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, admin_id.to_string()))
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure_cookies)
            .path("/")
            .build()
    }

    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build(SESSION_COOKIE).path("/").build()
    }
}

/// Cookie keys need at least 32 bytes; shorter secrets are stretched to the
/// hex SHA-256 digest.
fn key_material(secret: &str) -> Vec<u8> {
    if secret.len() >= 32 {
        secret.as_bytes().to_vec()
    } else {
        format!("{:x}", Sha256::digest(secret.as_bytes())).into_bytes()
    }
}

/// Shared password from `x-admin-password`, `x-admin-key` or `Authorization: Bearer`.
pub fn read_password_header(headers: &HeaderMap) -> Option<String> {
    let value = ["x-admin-password", "x-admin-key"]
        .iter()
        .find_map(|name| headers.get(*name))
        .or_else(|| headers.get(header::AUTHORIZATION))?
        .to_str()
        .ok()?
        .trim();
    let value = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Byte comparison whose running time depends only on the length.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::encode_b64(uuid::Uuid::new_v4().as_bytes())
        .map_err(|e| Error::Internal(format!("salt: {e}")))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Internal(format!("password hash: {e}")))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            warn!(%err, "stored password hash is not a PHC string");
            false
        }
    }
}

/// Shape checks shared by login and the admin seeding tool.
pub fn validate_credentials(email: &str, password: &str) -> Result<()> {
    if !EMAIL.is_match(email.trim()) {
        return Err(Error::invalid("email", "must be an email address"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::invalid(
            "password",
            format!("must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}

/// Check an email/password pair against `admin_user`. Unknown email, inactive
/// account and wrong password all read as `Unauthorized`.
#[instrument(skip_all)]
pub async fn login(store: &Store, email: &str, password: &str) -> Result<AdminUser> {
    validate_credentials(email, password)?;
    let Some(admin) = store.find_admin_by_email(email).await? else {
        info!("login for unknown email");
        return Err(Error::Unauthorized);
    };
    if !admin.is_active || !verify_password(password, &admin.password_hash) {
        info!(admin_id = admin.id, "login rejected");
        return Err(Error::Unauthorized);
    }
    info!(admin_id = admin.id, "admin logged in");
    Ok(admin)
}
