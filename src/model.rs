use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type BookId = i64;
pub type RetailerId = i64;

/// Who is asking. Public callers never see unpublished books or inactive links.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Access {
    Public,
    Admin,
}

impl Access {
    pub fn is_admin(&self) -> bool {
        matches!(self, Access::Admin)
    }
}

/// Which books a public listing may contain.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ListScope {
    /// `is_published = true`
    #[default]
    Published,
    /// `is_published = true OR coming_soon = true`
    Live,
}

impl ListScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListScope::Published => "published",
            ListScope::Live => "live",
        }
    }

    pub fn parse_scope(s: &str) -> Option<Self> {
        match s {
            "published" => Some(ListScope::Published),
            "live" => Some(ListScope::Live),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub slug: String,
    pub title: String,
    pub subtitle1: Option<String>,
    pub subtitle2: Option<String>,
    pub isbn: Option<String>,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    pub cover_image_url: Option<String>,
    pub back_cover_image_url: Option<String>,
    pub direct_sale_enabled: bool,
    pub stripe_product_id: Option<String>,
    pub paypal_button_id: Option<String>,
    pub is_published: bool,
    pub coming_soon: bool,
    pub tags: Vec<String>,
    /// Schema-less on purpose: payment providers add keys over time.
    pub sales_metadata: Map<String, Value>,
    pub seo: Map<String, Value>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Retailer {
    pub id: RetailerId,
    pub slug: String,
    pub name: String,
    pub kind: String,
    pub icon_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A purchase link joined with the retailer it points at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RetailerLink {
    pub retailer_id: RetailerId,
    pub name: String,
    pub slug: String,
    pub kind: String,
    pub url: String,
    pub logo_url: Option<String>,
    /// Link flag; public reads already filter on both link and retailer flags.
    pub is_active: bool,
    pub retailer_active: bool,
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookWithLinks {
    pub book: Book,
    pub retailers: Vec<RetailerLink>,
}

/// Row shape of the public book list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    pub id: BookId,
    pub slug: String,
    pub title: String,
    pub coming_soon: bool,
    pub direct_sale_enabled: bool,
    pub retailers: Vec<LinkSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LinkSummary {
    pub retailer_name: String,
    pub url: String,
}

impl From<&BookWithLinks> for BookSummary {
    fn from(b: &BookWithLinks) -> Self {
        BookSummary {
            id: b.book.id,
            slug: b.book.slug.clone(),
            title: b.book.title.clone(),
            coming_soon: b.book.coming_soon,
            direct_sale_enabled: b.book.direct_sale_enabled,
            retailers: b
                .retailers
                .iter()
                .map(|l| LinkSummary {
                    retailer_name: l.name.clone(),
                    url: l.url.clone(),
                })
                .collect(),
        }
    }
}

/// Public detail: every book field plus the active link array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookDetail {
    #[serde(flatten)]
    pub book: Book,
    pub retailers: Vec<LinkSummary>,
}

impl From<&BookWithLinks> for BookDetail {
    fn from(b: &BookWithLinks) -> Self {
        BookDetail {
            book: b.book.clone(),
            retailers: BookSummary::from(b).retailers,
        }
    }
}

/// Validated, normalised book fields ready to be written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookDraft {
    pub slug: String,
    pub title: String,
    pub subtitle1: Option<String>,
    pub subtitle2: Option<String>,
    pub isbn: Option<String>,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    pub cover_image_url: Option<String>,
    pub back_cover_image_url: Option<String>,
    pub direct_sale_enabled: bool,
    pub stripe_product_id: Option<String>,
    pub paypal_button_id: Option<String>,
    pub is_published: bool,
    pub coming_soon: bool,
    pub tags: Vec<String>,
    pub sales_metadata: Map<String, Value>,
    pub seo: Map<String, Value>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
}

/// Validated purchase link. `retailer_name` is `None` when the admin referenced
/// an existing retailer by slug only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDraft {
    pub retailer_slug: String,
    pub retailer_name: Option<String>,
    pub kind: Option<String>,
    pub logo_url: Option<String>,
    pub url: String,
    pub is_active: bool,
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SavedBook {
    pub id: BookId,
    pub slug: String,
    /// An existing retailer's name, kind or icon was rewritten by this save.
    #[serde(skip)]
    pub retailers_changed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
