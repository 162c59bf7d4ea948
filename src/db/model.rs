//! Row mapping for repository queries.
//!
//! Column lists live next to their decoders so a SELECT and the function that
//! reads it cannot drift apart. Business rules belong in higher layers.

use crate::error::{Error, Result};
use crate::model::{AdminUser, Book, Retailer, RetailerLink};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// Columns of `book b`, aliased so decoding does not depend on SQLite's
/// column naming rules.
pub(crate) const BOOK_COLUMNS: &str = "b.id AS id, b.slug AS slug, b.title AS title, \
     b.subtitle_1 AS subtitle_1, b.subtitle_2 AS subtitle_2, b.isbn AS isbn, \
     b.short_description AS short_description, b.long_description AS long_description, \
     b.cover_image_url AS cover_image_url, b.back_cover_image_url AS back_cover_image_url, \
     b.direct_sale_enabled AS direct_sale_enabled, b.stripe_product_id AS stripe_product_id, \
     b.paypal_button_id AS paypal_button_id, b.is_published AS is_published, \
     b.coming_soon AS coming_soon, b.tags AS tags, b.sales_metadata AS sales_metadata, \
     b.seo AS seo, b.seo_title AS seo_title, b.seo_description AS seo_description, \
     b.created_at AS created_at, b.updated_at AS updated_at";

/// Columns of `book_retailer_link l JOIN retailer r`.
pub(crate) const LINK_COLUMNS: &str = "l.book_id AS book_id, l.retailer_id AS retailer_id, \
     r.name AS name, r.slug AS slug, r.kind AS kind, r.icon_url AS icon_url, \
     r.is_active AS retailer_active, l.url AS url, l.is_active AS is_active, l.types AS types";

pub(crate) const RETAILER_COLUMNS: &str =
    "id, slug, name, kind, icon_url, is_active, created_at, updated_at";

pub(crate) const ADMIN_COLUMNS: &str =
    "id, email, password_hash, display_name, is_active, created_at";

pub(crate) fn book_from_row(row: &SqliteRow) -> Result<Book> {
    Ok(Book {
        id: row.try_get("id")?,
        slug: row.try_get("slug")?,
        title: row.try_get("title")?,
        subtitle1: row.try_get("subtitle_1")?,
        subtitle2: row.try_get("subtitle_2")?,
        isbn: row.try_get("isbn")?,
        short_description: row.try_get("short_description")?,
        long_description: row.try_get("long_description")?,
        cover_image_url: row.try_get("cover_image_url")?,
        back_cover_image_url: row.try_get("back_cover_image_url")?,
        direct_sale_enabled: row.try_get("direct_sale_enabled")?,
        stripe_product_id: row.try_get("stripe_product_id")?,
        paypal_button_id: row.try_get("paypal_button_id")?,
        is_published: row.try_get("is_published")?,
        coming_soon: row.try_get("coming_soon")?,
        tags: decode_lenient(row.try_get("tags")?),
        sales_metadata: decode_object(row.try_get("sales_metadata")?),
        seo: decode_object(row.try_get("seo")?),
        seo_title: row.try_get("seo_title")?,
        seo_description: row.try_get("seo_description")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Returns the owning book id alongside the link.
pub(crate) fn link_from_row(row: &SqliteRow) -> Result<(i64, RetailerLink)> {
    let book_id: i64 = row.try_get("book_id")?;
    let link = RetailerLink {
        retailer_id: row.try_get("retailer_id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        kind: row.try_get("kind")?,
        url: row.try_get("url")?,
        logo_url: row.try_get("icon_url")?,
        is_active: row.try_get("is_active")?,
        retailer_active: row.try_get("retailer_active")?,
        types: decode_lenient(row.try_get("types")?),
    };
    Ok((book_id, link))
}

pub(crate) fn retailer_from_row(row: &SqliteRow) -> Result<Retailer> {
    Ok(Retailer {
        id: row.try_get("id")?,
        slug: row.try_get("slug")?,
        name: row.try_get("name")?,
        kind: row.try_get("kind")?,
        icon_url: row.try_get("icon_url")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn admin_from_row(row: &SqliteRow) -> Result<AdminUser> {
    Ok(AdminUser {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        display_name: row.try_get("display_name")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

pub(crate) fn encode_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Internal(format!("json encode: {e}")))
}

/// Hand-edited rows may hold anything; a value that does not decode reads as empty.
fn decode_lenient<T: DeserializeOwned + Default>(raw: Option<String>) -> T {
    raw.as_deref()
        .and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

fn decode_object(raw: Option<String>) -> Map<String, Value> {
    decode_lenient(raw)
}
