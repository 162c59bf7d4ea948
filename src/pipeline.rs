//! Admin "save book" pipeline: authorise, validate, write atomically, revalidate pages.
use crate::cache::Revalidate;
use crate::db::Store;
use crate::error::{Error, Result};
use crate::model::{Access, BookDraft, LinkDraft, SavedBook};
use crate::slug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{error, info, instrument};

/// Book form as submitted by the admin UI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPayload {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub subtitle1: Option<String>,
    pub subtitle2: Option<String>,
    pub isbn: Option<String>,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    pub cover_image_url: Option<String>,
    pub back_cover_image_url: Option<String>,
    pub direct_sale_enabled: Option<bool>,
    pub stripe_product_id: Option<String>,
    pub paypal_button_id: Option<String>,
    pub is_published: Option<bool>,
    pub coming_soon: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub sales_metadata: Option<Map<String, Value>>,
    pub seo: Option<Map<String, Value>>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub retailers: Option<Vec<RetailerPayload>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetailerPayload {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub kind: Option<String>,
    pub url: Option<String>,
    pub logo_url: Option<String>,
    pub is_active: Option<bool>,
    pub types: Option<Vec<String>>,
}

/// Validate and normalise a payload. Pure: no I/O, first violation wins.
pub fn validate(payload: &BookPayload) -> Result<(BookDraft, Vec<LinkDraft>)> {
    let title = trimmed(payload.title.as_deref())
        .ok_or_else(|| Error::invalid("title", "required"))?;
    let slug = slug::resolve(payload.slug.as_deref(), &title);
    if slug.is_empty() {
        return Err(Error::invalid(
            "slug",
            "must contain at least one letter or digit",
        ));
    }

    let cover_image_url = optional_url("coverImageUrl", payload.cover_image_url.as_deref())?;
    let back_cover_image_url =
        optional_url("backCoverImageUrl", payload.back_cover_image_url.as_deref())?;

    let draft = BookDraft {
        slug,
        title,
        subtitle1: trimmed(payload.subtitle1.as_deref()),
        subtitle2: trimmed(payload.subtitle2.as_deref()),
        isbn: trimmed(payload.isbn.as_deref()),
        short_description: trimmed(payload.short_description.as_deref()),
        long_description: trimmed(payload.long_description.as_deref()),
        cover_image_url,
        back_cover_image_url,
        direct_sale_enabled: payload.direct_sale_enabled.unwrap_or(false),
        stripe_product_id: trimmed(payload.stripe_product_id.as_deref()),
        paypal_button_id: trimmed(payload.paypal_button_id.as_deref()),
        // Absent means published; an explicit `false` keeps the book hidden.
        is_published: payload.is_published.unwrap_or(true),
        coming_soon: payload.coming_soon.unwrap_or(false),
        tags: clean_list(payload.tags.as_deref()),
        sales_metadata: payload.sales_metadata.clone().unwrap_or_default(),
        seo: payload.seo.clone().unwrap_or_default(),
        seo_title: trimmed(payload.seo_title.as_deref()),
        seo_description: trimmed(payload.seo_description.as_deref()),
    };

    let retailers = payload.retailers.as_deref().unwrap_or_default();
    let mut links = Vec::with_capacity(retailers.len());
    let mut seen = HashSet::new();
    for (idx, r) in retailers.iter().enumerate() {
        let link = validate_link(idx, r)?;
        if !seen.insert(link.retailer_slug.clone()) {
            return Err(Error::invalid(
                format!("retailers[{idx}]"),
                format!("retailer {} listed twice", link.retailer_slug),
            ));
        }
        links.push(link);
    }

    Ok((draft, links))
}

fn validate_link(idx: usize, r: &RetailerPayload) -> Result<LinkDraft> {
    let name = trimmed(r.name.as_deref());
    let explicit_slug = r.slug.as_deref().map(slug::slugify).filter(|s| !s.is_empty());
    let retailer_slug = match (&explicit_slug, &name) {
        (Some(s), _) => s.clone(),
        (None, Some(n)) => slug::slugify(n),
        (None, None) => {
            return Err(Error::invalid(
                format!("retailers[{idx}].name"),
                "name or slug required",
            ))
        }
    };
    if retailer_slug.is_empty() {
        return Err(Error::invalid(
            format!("retailers[{idx}].name"),
            "must contain at least one letter or digit",
        ));
    }

    let url = trimmed(r.url.as_deref())
        .ok_or_else(|| Error::invalid(format!("retailers[{idx}].url"), "required"))?;
    let url = absolute_url(&format!("retailers[{idx}].url"), &url)?;
    let logo_url = optional_url(&format!("retailers[{idx}].logoUrl"), r.logo_url.as_deref())?;

    Ok(LinkDraft {
        retailer_slug,
        retailer_name: name,
        kind: trimmed(r.kind.as_deref()),
        logo_url,
        url,
        is_active: r.is_active.unwrap_or(true),
        types: clean_list(r.types.as_deref()),
    })
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn clean_list(values: Option<&[String]>) -> Vec<String> {
    values
        .unwrap_or_default()
        .iter()
        .filter_map(|v| trimmed(Some(v)))
        .collect()
}

fn optional_url(field: &str, value: Option<&str>) -> Result<Option<String>> {
    trimmed(value).map(|v| absolute_url(field, &v)).transpose()
}

fn absolute_url(field: &str, value: &str) -> Result<String> {
    match url::Url::parse(value) {
        Ok(u) if matches!(u.scheme(), "http" | "https") && u.has_host() => Ok(value.to_string()),
        _ => Err(Error::invalid(field, "must be an absolute http(s) URL")),
    }
}

/// Paths whose cached rendering shows `slug`.
pub fn affected_paths(slug: &str) -> Vec<String> {
    vec!["/".to_string(), "/books".to_string(), format!("/books/{slug}")]
}

/// Run the full save: `access` must come from the auth guard. No retries; a
/// failure leaves both the book row and its links as they were.
#[instrument(skip_all)]
pub async fn save_book(
    store: Option<&Store>,
    access: Access,
    payload: &BookPayload,
    pages: &dyn Revalidate,
) -> Result<SavedBook> {
    if !access.is_admin() {
        return Err(Error::Unauthorized);
    }
    let (draft, links) = validate(payload)?;
    let store = store.ok_or_else(|| Error::Unavailable("database not configured".into()))?;

    let saved = match store.save_book(&draft, &links).await {
        Ok(saved) => saved,
        Err(err) => {
            if !err.is_client_error() {
                error!(?err, slug = %draft.slug, "failed to save book");
            }
            return Err(err);
        }
    };
    info!(id = saved.id, slug = %saved.slug, links = links.len(), "saved book");

    if saved.retailers_changed {
        // Other books' pages show the same retailer row.
        pages.revalidate_all().await;
    } else {
        pages.revalidate(&affected_paths(&saved.slug)).await;
    }
    Ok(saved)
}
