//! Visitor-facing reads. None of these fail because the store is down: an
//! unconfigured or unreachable database reads as an empty catalog.
use super::response::ok;
use super::{render, ApiError, ApiResult, AppState};
use crate::db::{Store, MAX_LIST_LIMIT};
use crate::error::Error;
use crate::model::{Access, BookDetail, BookSummary, BookWithLinks, ListScope};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// A public read plus whether it actually came from the store.
#[derive(Debug)]
pub struct Fetched<T> {
    pub value: T,
    pub from_store: bool,
}

impl<T: Default> Fetched<T> {
    fn degraded() -> Self {
        Self {
            value: T::default(),
            from_store: false,
        }
    }

    fn fresh(value: T) -> Self {
        Self {
            value,
            from_store: true,
        }
    }
}

pub async fn public_books(
    store: Option<&Store>,
    scope: ListScope,
    limit: i64,
) -> Fetched<Vec<BookWithLinks>> {
    let Some(store) = store else {
        debug!("no store configured; empty book list");
        return Fetched::degraded();
    };
    match store.list_public_books(scope, limit).await {
        Ok(books) => Fetched::fresh(books),
        Err(err) => {
            warn!(?err, "book list degraded to empty");
            Fetched::degraded()
        }
    }
}

pub async fn public_book(store: Option<&Store>, slug: &str) -> Fetched<Option<BookWithLinks>> {
    let Some(store) = store else {
        return Fetched::degraded();
    };
    match store.get_book_by_slug(slug, Access::Public).await {
        Ok(book) => Fetched::fresh(book),
        Err(err) => {
            warn!(?err, slug, "book lookup degraded to not found");
            Fetched::degraded()
        }
    }
}

pub async fn featured_book(store: Option<&Store>) -> Fetched<Option<BookWithLinks>> {
    let Some(store) = store else {
        return Fetched::degraded();
    };
    match store.featured_book().await {
        Ok(book) => Fetched::fresh(book),
        Err(err) => {
            warn!(?err, "featured book degraded to none");
            Fetched::degraded()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub scope: Option<String>,
    pub limit: Option<i64>,
}

impl ListParams {
    fn resolve(&self, default_limit: i64) -> Result<(ListScope, i64), Error> {
        let scope = match self.scope.as_deref() {
            None | Some("") => ListScope::default(),
            Some(s) => ListScope::parse_scope(s)
                .ok_or_else(|| Error::invalid("scope", "expected published or live"))?,
        };
        let limit = self.limit.unwrap_or(default_limit).clamp(1, MAX_LIST_LIMIT);
        Ok((scope, limit))
    }
}

pub async fn list_books(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Value>> {
    let (scope, limit) = params.resolve(state.public_list_limit)?;
    let books = public_books(state.store.as_ref(), scope, limit).await;
    let data: Vec<BookSummary> = books.value.iter().map(BookSummary::from).collect();
    Ok(ok(data))
}

pub async fn get_book(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Value>> {
    match public_book(state.store.as_ref(), &slug).await.value {
        Some(book) => Ok(ok(BookDetail::from(&book))),
        None => Err(ApiError(Error::NotFound)),
    }
}

pub async fn home_page(State(state): State<AppState>) -> Html<String> {
    if let Some(html) = state.pages.get("/").await {
        return Html(html);
    }
    let featured = featured_book(state.store.as_ref()).await;
    let html = render::home(featured.value.as_ref());
    if featured.from_store {
        state.pages.put("/", html.clone()).await;
    }
    Html(html)
}

pub async fn books_page(State(state): State<AppState>) -> Html<String> {
    if let Some(html) = state.pages.get("/books").await {
        return Html(html);
    }
    let books = public_books(
        state.store.as_ref(),
        ListScope::Published,
        state.public_list_limit,
    )
    .await;
    let html = render::book_list(&books.value);
    if books.from_store {
        state.pages.put("/books", html.clone()).await;
    }
    Html(html)
}

pub async fn book_page(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    let path = format!("/books/{slug}");
    if let Some(html) = state.pages.get(&path).await {
        return Html(html).into_response();
    }
    let fetched = public_book(state.store.as_ref(), &slug).await;
    match fetched.value {
        Some(book) => {
            let html = render::book_detail(&book);
            if fetched.from_store {
                state.pages.put(&path, html.clone()).await;
            }
            Html(html).into_response()
        }
        None => (StatusCode::NOT_FOUND, Html(render::not_found())).into_response(),
    }
}

pub async fn serve_upload(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.uploads.read(&name).await {
        Ok(Some((bytes, content_type))) => {
            ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => ApiError(err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_params_defaults_and_clamping() {
        let p = ListParams::default();
        assert_eq!(p.resolve(50).unwrap(), (ListScope::Published, 50));

        let p = ListParams {
            scope: Some("live".into()),
            limit: Some(100_000),
        };
        assert_eq!(p.resolve(50).unwrap(), (ListScope::Live, MAX_LIST_LIMIT));

        let p = ListParams {
            scope: None,
            limit: Some(-3),
        };
        assert_eq!(p.resolve(50).unwrap().1, 1);

        let p = ListParams {
            scope: Some("drafts".into()),
            limit: None,
        };
        assert!(matches!(p.resolve(50), Err(Error::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn missing_store_reads_as_empty() {
        let books = public_books(None, ListScope::Published, 10).await;
        assert!(books.value.is_empty());
        assert!(!books.from_store);
        assert!(public_book(None, "guide").await.value.is_none());
        assert!(featured_book(None).await.value.is_none());
    }

    #[tokio::test]
    async fn closed_pool_reads_as_empty() {
        let store = Store::connect("sqlite::memory:", 1).await.unwrap();
        store.migrate().await.unwrap();
        store.pool().close().await;

        let books = public_books(Some(&store), ListScope::Published, 10).await;
        assert!(books.value.is_empty());
        assert!(!books.from_store);
        assert!(public_book(Some(&store), "guide").await.value.is_none());
    }
}
