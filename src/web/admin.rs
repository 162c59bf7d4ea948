//! Admin JSON routes. Every handler resolves `Access` through the guard before
//! touching the store; login and logout are the only open routes.
use super::response::ok;
use super::{ApiError, ApiResult, AppState};
use crate::auth;
use crate::cache::Revalidate;
use crate::db::MAX_LIST_LIMIT;
use crate::error::Error;
use crate::model::Access;
use crate::pipeline::{self, BookPayload};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::HeaderMap;
use axum::Json;
use axum_extra::extract::cookie::SignedCookieJar;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument};

async fn require_admin(
    state: &AppState,
    headers: &HeaderMap,
    jar: &SignedCookieJar,
) -> Result<Access, Error> {
    match state.guard.access(headers, jar, state.store.as_ref()).await {
        Access::Admin => Ok(Access::Admin),
        Access::Public => Err(Error::Unauthorized),
    }
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, Error> {
    body.map(|Json(v)| v)
        .map_err(|rejection| Error::invalid("body", rejection.body_text()))
}

pub async fn list_books(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: SignedCookieJar,
) -> ApiResult<Json<Value>> {
    require_admin(&state, &headers, &jar).await?;
    let books = state.store()?.list_all_books(MAX_LIST_LIMIT).await?;
    Ok(ok(books))
}

pub async fn get_book(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: SignedCookieJar,
    Path(slug): Path<String>,
) -> ApiResult<Json<Value>> {
    require_admin(&state, &headers, &jar).await?;
    let book = state
        .store()?
        .get_book_by_slug(&slug, Access::Admin)
        .await?
        .ok_or(Error::NotFound)?;
    Ok(ok(book))
}

/// The guard runs before the body is looked at, so an anonymous caller gets
/// 401 even for a malformed payload.
pub async fn save_book(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: SignedCookieJar,
    body: Result<Json<BookPayload>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let access = state
        .guard
        .access(&headers, &jar, state.store.as_ref())
        .await;
    if !access.is_admin() {
        return Err(ApiError(Error::Unauthorized));
    }
    let payload = json_body(body)?;
    let saved =
        pipeline::save_book(state.store.as_ref(), access, &payload, &state.pages).await?;
    Ok(ok(saved))
}

#[instrument(skip_all, fields(slug = %slug))]
pub async fn delete_book(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: SignedCookieJar,
    Path(slug): Path<String>,
) -> ApiResult<Json<Value>> {
    require_admin(&state, &headers, &jar).await?;
    state.store()?.delete_book(&slug).await?;
    info!("deleted book");
    state.pages.revalidate(&pipeline::affected_paths(&slug)).await;
    Ok(ok(json!({ "slug": slug })))
}

pub async fn list_retailers(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: SignedCookieJar,
) -> ApiResult<Json<Value>> {
    require_admin(&state, &headers, &jar).await?;
    let retailers = state.store()?.list_retailers().await?;
    Ok(ok(retailers))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveFlag {
    pub is_active: bool,
}

#[instrument(skip_all, fields(slug = %slug))]
pub async fn set_retailer_active(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: SignedCookieJar,
    Path(slug): Path<String>,
    body: Result<Json<ActiveFlag>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    require_admin(&state, &headers, &jar).await?;
    let flag = json_body(body)?;
    state
        .store()?
        .set_retailer_active(&slug, flag.is_active)
        .await?;
    info!(active = flag.is_active, "retailer flag changed");
    // Any cached page may list this retailer.
    state.pages.clear().await;
    Ok(ok(json!({ "slug": slug, "isActive": flag.is_active })))
}

#[instrument(skip_all, fields(slug = %slug))]
pub async fn delete_retailer(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: SignedCookieJar,
    Path(slug): Path<String>,
) -> ApiResult<Json<Value>> {
    require_admin(&state, &headers, &jar).await?;
    state.store()?.delete_retailer(&slug).await?;
    info!("deleted retailer");
    Ok(ok(json!({ "slug": slug })))
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    body: Result<Json<LoginPayload>, JsonRejection>,
) -> ApiResult<(SignedCookieJar, Json<Value>)> {
    let creds = json_body(body)?;
    let admin = auth::login(state.store()?, &creds.email, &creds.password).await?;
    let jar = jar.add(state.guard.session_cookie(admin.id));
    Ok((jar, ok(admin)))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> (SignedCookieJar, Json<Value>) {
    let jar = jar.remove(state.guard.removal_cookie());
    (jar, Json(json!({ "ok": true })))
}

/// Multipart `file` plus an optional `filename` override.
#[instrument(skip_all)]
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: SignedCookieJar,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    require_admin(&state, &headers, &jar).await?;

    let mut file: Option<(Option<String>, Vec<u8>)> = None;
    let mut filename: Option<String> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::invalid("file", e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let original = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| Error::invalid("file", e.body_text()))?;
                file = Some((original, bytes.to_vec()));
            }
            Some("filename") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| Error::invalid("filename", e.body_text()))?;
                filename = Some(text).filter(|t| !t.trim().is_empty());
            }
            _ => {}
        }
    }

    let (original, bytes) = file.ok_or_else(|| Error::invalid("file", "no file provided"))?;
    let name = filename
        .or(original)
        .unwrap_or_else(|| format!("upload-{}", chrono::Utc::now().timestamp_millis()));
    let stored = state.uploads.save(&name, &bytes).await?;
    Ok(Json(json!({ "ok": true, "url": stored.url, "name": stored.name })))
}
