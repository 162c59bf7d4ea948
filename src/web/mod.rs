//! HTTP surface: public JSON and HTML reads, admin JSON writes, uploads.
//!
//! Handlers stay thin: reads go through `Store`, the book save goes through
//! `pipeline::save_book`, and every admin route asks `AdminGuard` first.

pub mod admin;
pub mod public;
mod render;
mod response;

pub use response::{ApiError, ApiResult};

use crate::auth::AdminGuard;
use crate::cache::PageCache;
use crate::config::Config;
use crate::db::Store;
use crate::error::{Error, Result};
use crate::upload::UploadStore;
use axum::extract::{DefaultBodyLimit, FromRef};
use axum::routing::{get, post};
use axum::Router;
use axum_extra::extract::cookie::Key;

/// Shared request state. `store` is `None` when no database is configured or
/// it could not be reached at startup.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Option<Store>,
    pub guard: AdminGuard,
    pub pages: PageCache,
    pub uploads: UploadStore,
    pub public_list_limit: i64,
}

impl AppState {
    pub fn from_config(cfg: &Config, store: Option<Store>) -> Self {
        Self {
            store,
            guard: AdminGuard::from_config(cfg),
            pages: PageCache::new(),
            uploads: UploadStore::from_config(cfg),
            public_list_limit: cfg.app.public_list_limit,
        }
    }

    /// The store for paths that must not silently degrade.
    pub fn store(&self) -> Result<&Store> {
        self.store
            .as_ref()
            .ok_or_else(|| Error::Unavailable("database not configured".into()))
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.guard.key()
    }
}

pub fn router(state: AppState) -> Router {
    // Multipart framing needs a little room on top of the file itself.
    let body_limit = state.uploads.max_bytes() + 64 * 1024;

    Router::new()
        .route("/", get(public::home_page))
        .route("/books", get(public::books_page))
        .route("/books/:slug", get(public::book_page))
        .route("/uploads/:name", get(public::serve_upload))
        .route("/api/books", get(public::list_books))
        .route("/api/books/:slug", get(public::get_book))
        .route(
            "/api/admin/books",
            get(admin::list_books).post(admin::save_book),
        )
        .route(
            "/api/admin/books/:slug",
            get(admin::get_book).delete(admin::delete_book),
        )
        .route("/api/admin/retailers", get(admin::list_retailers))
        .route(
            "/api/admin/retailers/:slug",
            axum::routing::delete(admin::delete_retailer),
        )
        .route(
            "/api/admin/retailers/:slug/active",
            post(admin::set_retailer_active),
        )
        .route("/api/admin/login", post(admin::login))
        .route("/api/admin/logout", post(admin::logout))
        .route("/api/admin/uploads", post(admin::upload))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
