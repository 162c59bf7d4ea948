use super::model::{
    admin_from_row, book_from_row, encode_json, link_from_row, retailer_from_row, ADMIN_COLUMNS,
    BOOK_COLUMNS, LINK_COLUMNS, RETAILER_COLUMNS,
};
use crate::error::{Error, Result};
use crate::model::{
    Access, AdminUser, Book, BookDraft, BookId, BookWithLinks, LinkDraft, ListScope, Retailer,
    RetailerId, RetailerLink, SavedBook,
};
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool, Transaction};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument};

pub type Pool = SqlitePool;
type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Upper bound for any listing; keeps the `IN (...)` parameter list bounded.
pub const MAX_LIST_LIMIT: i64 = 500;

pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<Pool> {
    if let Some(dir) = database_dir(database_url) {
        std::fs::create_dir_all(dir)?;
    }
    let in_memory = database_url.starts_with("sqlite::memory");
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| Error::Unavailable(format!("invalid database url: {e}")))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full)
        .foreign_keys(true);

    // Every in-memory connection is its own database: pin a single one for good.
    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(max_connections.max(1))
    };
    let pool = pool_options.connect_with(options).await?;
    Ok(pool)
}

/// Directory a file-backed `sqlite:` URL lives in, so `create_if_missing` can
/// open it. `None` for in-memory and non-sqlite URLs.
fn database_dir(url: &str) -> Option<&Path> {
    let rest = url.strip_prefix("sqlite:")?;
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path.starts_with(":memory") {
        return None;
    }
    Path::new(path).parent().filter(|p| !p.as_os_str().is_empty())
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// The only sanctioned path into the catalog tables.
///
/// Cloning is cheap; clones share the pool and the statement counter.
#[derive(Debug, Clone)]
pub struct Store {
    pool: Pool,
    statements: Arc<AtomicUsize>,
}

impl Store {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = init_pool(database_url, max_connections).await?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: Pool) -> Self {
        Self {
            pool,
            statements: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        run_migrations(&self.pool).await
    }

    /// Number of SQL statements issued through this store (and its clones).
    pub fn statement_count(&self) -> usize {
        self.statements.load(Ordering::Relaxed)
    }

    fn tick(&self) {
        self.statements.fetch_add(1, Ordering::Relaxed);
    }

    // ---- reads ---------------------------------------------------------

    /// One book by exact slug plus its links, ordered by retailer name.
    /// Public callers get `None` for unpublished books and only see links
    /// where both the link and the retailer are active.
    #[instrument(skip_all, fields(slug = %slug, access = ?access))]
    pub async fn get_book_by_slug(
        &self,
        slug: &str,
        access: Access,
    ) -> Result<Option<BookWithLinks>> {
        self.tick();
        let row = sqlx::query(&format!("SELECT {BOOK_COLUMNS} FROM book b WHERE b.slug = ?"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let book = book_from_row(&row)?;
        if !access.is_admin() && !book.is_published {
            debug!(slug, "unpublished book hidden from public caller");
            return Ok(None);
        }

        let mut links = self.links_for_books(&[book.id], access).await?;
        let retailers = links.remove(&book.id).unwrap_or_default();
        Ok(Some(BookWithLinks { book, retailers }))
    }

    /// Newest-first public listing with active links. Issues one statement for
    /// the books and at most one more for all of their links.
    #[instrument(skip_all, fields(scope = scope.as_str(), limit = limit))]
    pub async fn list_public_books(
        &self,
        scope: ListScope,
        limit: i64,
    ) -> Result<Vec<BookWithLinks>> {
        let filter = scope_filter(scope);
        self.tick();
        let rows = sqlx::query(&format!(
            "SELECT {BOOK_COLUMNS} FROM book b WHERE {filter} \
             ORDER BY b.created_at DESC, b.id DESC LIMIT ?"
        ))
        .bind(clamp_limit(limit))
        .fetch_all(&self.pool)
        .await?;
        let books = rows.iter().map(book_from_row).collect::<Result<Vec<_>>>()?;
        self.attach_links(books, Access::Public).await
    }

    /// The book for the home page: the newest published one, preferring books
    /// already on sale over coming-soon ones.
    #[instrument(skip_all)]
    pub async fn featured_book(&self) -> Result<Option<BookWithLinks>> {
        let filter = scope_filter(ListScope::Published);
        self.tick();
        let row = sqlx::query(&format!(
            "SELECT {BOOK_COLUMNS} FROM book b WHERE {filter} \
             ORDER BY b.coming_soon ASC, b.created_at DESC, b.id DESC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let books = vec![book_from_row(&row)?];
        Ok(self.attach_links(books, Access::Public).await?.pop())
    }

    /// Every book regardless of flags, for the admin dashboard. No links.
    #[instrument(skip_all)]
    pub async fn list_all_books(&self, limit: i64) -> Result<Vec<Book>> {
        self.tick();
        let rows = sqlx::query(&format!(
            "SELECT {BOOK_COLUMNS} FROM book b ORDER BY b.created_at DESC, b.id DESC LIMIT ?"
        ))
        .bind(clamp_limit(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(book_from_row).collect()
    }

    async fn attach_links(&self, books: Vec<Book>, access: Access) -> Result<Vec<BookWithLinks>> {
        let ids: Vec<BookId> = books.iter().map(|b| b.id).collect();
        let mut links = self.links_for_books(&ids, access).await?;
        Ok(books
            .into_iter()
            .map(|book| {
                let retailers = links.remove(&book.id).unwrap_or_default();
                BookWithLinks { book, retailers }
            })
            .collect())
    }

    /// Links for a set of books in a single statement (none when `ids` is empty).
    async fn links_for_books(
        &self,
        ids: &[BookId],
        access: Access,
    ) -> Result<HashMap<BookId, Vec<RetailerLink>>> {
        let mut grouped: HashMap<BookId, Vec<RetailerLink>> = HashMap::new();
        if ids.is_empty() {
            return Ok(grouped);
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {LINK_COLUMNS} FROM book_retailer_link l \
             JOIN retailer r ON r.id = l.retailer_id WHERE l.book_id IN ("
        ));
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        if !access.is_admin() {
            qb.push(" AND l.is_active = 1 AND r.is_active = 1");
        }
        qb.push(" ORDER BY r.name COLLATE NOCASE ASC, r.slug ASC");

        self.tick();
        let rows = qb.build().fetch_all(&self.pool).await?;
        for row in &rows {
            let (book_id, link) = link_from_row(row)?;
            grouped.entry(book_id).or_default().push(link);
        }
        Ok(grouped)
    }

    // ---- writes --------------------------------------------------------

    /// Insert or update-by-slug in one statement; returns the row id.
    #[instrument(skip_all, fields(slug = %draft.slug))]
    pub async fn upsert_book(&self, draft: &BookDraft) -> Result<BookId> {
        let mut tx = self.pool.begin().await?;
        let id = self.upsert_book_tx(&mut tx, draft).await?;
        tx.commit().await?;
        Ok(id)
    }

    /// Plain insert; an existing slug is a `Conflict`.
    #[instrument(skip_all, fields(slug = %draft.slug))]
    pub async fn insert_book(&self, draft: &BookDraft) -> Result<BookId> {
        let sql = format!("{INSERT_BOOK} RETURNING id");
        self.tick();
        let row = bind_draft(sqlx::query(&sql), draft)?
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("id")?)
    }

    /// Swap the whole link set of a book for `links`, atomically.
    #[instrument(skip_all, fields(book_id = book_id, links = links.len()))]
    pub async fn replace_book_retailer_links(
        &self,
        book_id: BookId,
        links: &[LinkDraft],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        self.tick();
        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM book WHERE id = ?")
            .bind(book_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(Error::NotFound);
        }
        self.replace_links_tx(&mut tx, book_id, links).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Book upsert and link replacement as one transaction.
    #[instrument(skip_all, fields(slug = %draft.slug, links = links.len()))]
    pub async fn save_book(&self, draft: &BookDraft, links: &[LinkDraft]) -> Result<SavedBook> {
        let mut tx = self.pool.begin().await?;
        let id = self.upsert_book_tx(&mut tx, draft).await?;
        let retailers_changed = self.replace_links_tx(&mut tx, id, links).await?;
        tx.commit().await?;
        Ok(SavedBook {
            id,
            slug: draft.slug.clone(),
            retailers_changed,
        })
    }

    /// Deletes a book; its links go with it.
    #[instrument(skip_all, fields(slug = %slug))]
    pub async fn delete_book(&self, slug: &str) -> Result<()> {
        self.tick();
        let res = sqlx::query("DELETE FROM book WHERE slug = ?")
            .bind(slug)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    async fn upsert_book_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        draft: &BookDraft,
    ) -> Result<BookId> {
        let sql = format!("{INSERT_BOOK} {UPSERT_BOOK_TAIL}");
        self.tick();
        let row = bind_draft(sqlx::query(&sql), draft)?
            .fetch_one(&mut **tx)
            .await?;
        Ok(row.try_get("id")?)
    }

    async fn replace_links_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        book_id: BookId,
        links: &[LinkDraft],
    ) -> Result<bool> {
        self.tick();
        let removed = sqlx::query("DELETE FROM book_retailer_link WHERE book_id = ?")
            .bind(book_id)
            .execute(&mut **tx)
            .await?
            .rows_affected();
        debug!(book_id, removed, "cleared retailer links");

        let mut retailers_changed = false;
        for (idx, link) in links.iter().enumerate() {
            let (retailer_id, changed) = self.resolve_retailer_tx(tx, idx, link).await?;
            retailers_changed |= changed;
            self.tick();
            sqlx::query(
                "INSERT INTO book_retailer_link (book_id, retailer_id, url, is_active, types) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(book_id)
            .bind(retailer_id)
            .bind(link.url.as_str())
            .bind(link.is_active)
            .bind(encode_json(&link.types)?)
            .execute(&mut **tx)
            .await?;
        }
        Ok(retailers_changed)
    }

    /// Find the retailer a link points at. With a name the retailer is created
    /// or refreshed by slug; with only a slug it must already exist.
    ///
    /// The flag is true when an existing retailer row was rewritten, which
    /// changes every page that shows it.
    async fn resolve_retailer_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        idx: usize,
        link: &LinkDraft,
    ) -> Result<(RetailerId, bool)> {
        self.tick();
        let existing = sqlx::query(&format!(
            "SELECT {RETAILER_COLUMNS} FROM retailer WHERE slug = ?"
        ))
        .bind(link.retailer_slug.as_str())
        .fetch_optional(&mut **tx)
        .await?
        .map(|row| retailer_from_row(&row))
        .transpose()?;

        let Some(name) = link.retailer_name.as_deref() else {
            return existing.map(|r| (r.id, false)).ok_or_else(|| {
                Error::invalid(format!("retailers[{idx}].slug"), "unknown retailer")
            });
        };
        if let Some(current) = &existing {
            if !retailer_needs_update(current, name, link) {
                return Ok((current.id, false));
            }
        }

        self.tick();
        let row = sqlx::query(
            "INSERT INTO retailer (name, slug, kind, icon_url) \
             VALUES (?, ?, COALESCE(?, 'marketplace'), ?) \
             ON CONFLICT (slug) DO UPDATE SET \
               name = excluded.name, \
               kind = CASE WHEN ? IS NULL THEN retailer.kind ELSE excluded.kind END, \
               icon_url = COALESCE(excluded.icon_url, retailer.icon_url), \
               updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') \
             RETURNING id",
        )
        .bind(name)
        .bind(link.retailer_slug.as_str())
        .bind(link.kind.as_deref())
        .bind(link.logo_url.as_deref())
        .bind(link.kind.as_deref())
        .fetch_one(&mut **tx)
        .await?;
        let id: RetailerId = row.try_get("id")?;
        if existing.is_some() {
            debug!(retailer = %link.retailer_slug, "refreshed shared retailer");
        }
        Ok((id, existing.is_some()))
    }

    // ---- retailers -----------------------------------------------------

    #[instrument(skip_all)]
    pub async fn list_retailers(&self) -> Result<Vec<Retailer>> {
        self.tick();
        let rows = sqlx::query(&format!(
            "SELECT {RETAILER_COLUMNS} FROM retailer ORDER BY name COLLATE NOCASE ASC, slug ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(retailer_from_row).collect()
    }

    #[instrument(skip_all, fields(slug = %slug, active = active))]
    pub async fn set_retailer_active(&self, slug: &str, active: bool) -> Result<()> {
        self.tick();
        let res = sqlx::query(
            "UPDATE retailer SET is_active = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') \
             WHERE slug = ?",
        )
        .bind(active)
        .bind(slug)
        .execute(&self.pool)
        .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    /// Refuses while any book still links to the retailer.
    #[instrument(skip_all, fields(slug = %slug))]
    pub async fn delete_retailer(&self, slug: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        self.tick();
        let linked: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM book_retailer_link l JOIN retailer r ON r.id = l.retailer_id \
             WHERE r.slug = ?",
        )
        .bind(slug)
        .fetch_one(&mut *tx)
        .await?;
        if linked > 0 {
            return Err(Error::Conflict(format!(
                "retailer {slug} is still linked from {linked} book(s)"
            )));
        }
        self.tick();
        let res = sqlx::query("DELETE FROM retailer WHERE slug = ?")
            .bind(slug)
            .execute(&mut *tx)
            .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound);
        }
        tx.commit().await?;
        Ok(())
    }

    // ---- admin users ---------------------------------------------------

    #[instrument(skip_all)]
    pub async fn create_admin_user(
        &self,
        email: &str,
        password_hash: &str,
        display_name: Option<&str>,
    ) -> Result<i64> {
        self.tick();
        let row = sqlx::query(
            "INSERT INTO admin_user (email, password_hash, display_name) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(email.trim().to_lowercase())
        .bind(password_hash)
        .bind(display_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match Error::from(err) {
            Error::Conflict(_) => Error::Conflict("admin user already exists".into()),
            other => other,
        })?;
        Ok(row.try_get("id")?)
    }

    #[instrument(skip_all)]
    pub async fn find_admin_by_email(&self, email: &str) -> Result<Option<AdminUser>> {
        self.tick();
        let row = sqlx::query(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admin_user WHERE email = ?"
        ))
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(admin_from_row).transpose()
    }

    #[instrument(skip_all, fields(admin_id = admin_id))]
    pub async fn is_active_admin(&self, admin_id: i64) -> Result<bool> {
        self.tick();
        let active = sqlx::query_scalar::<_, bool>("SELECT is_active FROM admin_user WHERE id = ?")
            .bind(admin_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(active.unwrap_or(false))
    }
}

const INSERT_BOOK: &str = "INSERT INTO book (slug, title, subtitle_1, subtitle_2, isbn, \
     short_description, long_description, cover_image_url, back_cover_image_url, \
     direct_sale_enabled, stripe_product_id, paypal_button_id, is_published, coming_soon, \
     tags, sales_metadata, seo, seo_title, seo_description) \
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

/// Every mutable column follows the latest write; `created_at` is kept.
const UPSERT_BOOK_TAIL: &str = "ON CONFLICT (slug) DO UPDATE SET \
     title = excluded.title, subtitle_1 = excluded.subtitle_1, subtitle_2 = excluded.subtitle_2, \
     isbn = excluded.isbn, short_description = excluded.short_description, \
     long_description = excluded.long_description, cover_image_url = excluded.cover_image_url, \
     back_cover_image_url = excluded.back_cover_image_url, \
     direct_sale_enabled = excluded.direct_sale_enabled, \
     stripe_product_id = excluded.stripe_product_id, paypal_button_id = excluded.paypal_button_id, \
     is_published = excluded.is_published, coming_soon = excluded.coming_soon, \
     tags = excluded.tags, sales_metadata = excluded.sales_metadata, seo = excluded.seo, \
     seo_title = excluded.seo_title, seo_description = excluded.seo_description, \
     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') \
     RETURNING id";

fn bind_draft<'q>(query: SqliteQuery<'q>, draft: &'q BookDraft) -> Result<SqliteQuery<'q>> {
    Ok(query
        .bind(draft.slug.as_str())
        .bind(draft.title.as_str())
        .bind(draft.subtitle1.as_deref())
        .bind(draft.subtitle2.as_deref())
        .bind(draft.isbn.as_deref())
        .bind(draft.short_description.as_deref())
        .bind(draft.long_description.as_deref())
        .bind(draft.cover_image_url.as_deref())
        .bind(draft.back_cover_image_url.as_deref())
        .bind(draft.direct_sale_enabled)
        .bind(draft.stripe_product_id.as_deref())
        .bind(draft.paypal_button_id.as_deref())
        .bind(draft.is_published)
        .bind(draft.coming_soon)
        .bind(encode_json(&draft.tags)?)
        .bind(encode_json(&draft.sales_metadata)?)
        .bind(encode_json(&draft.seo)?)
        .bind(draft.seo_title.as_deref())
        .bind(draft.seo_description.as_deref()))
}

fn retailer_needs_update(current: &Retailer, name: &str, link: &LinkDraft) -> bool {
    current.name != name
        || link.kind.as_deref().is_some_and(|k| k != current.kind)
        || link
            .logo_url
            .as_deref()
            .is_some_and(|u| current.icon_url.as_deref() != Some(u))
}

fn scope_filter(scope: ListScope) -> &'static str {
    match scope {
        ListScope::Published => "b.is_published = 1",
        ListScope::Live => "(b.is_published = 1 OR b.coming_soon = 1)",
    }
}

fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(0, MAX_LIST_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_store() -> Store {
        let store = Store::connect("sqlite::memory:", 1).await.unwrap();
        store.migrate().await.unwrap();
        store
    }

    fn draft(slug: &str, title: &str, published: bool) -> BookDraft {
        BookDraft {
            slug: slug.into(),
            title: title.into(),
            is_published: published,
            ..Default::default()
        }
    }

    fn link(name: &str, url: &str) -> LinkDraft {
        LinkDraft {
            retailer_slug: crate::slug::slugify(name),
            retailer_name: Some(name.into()),
            kind: None,
            logo_url: None,
            url: url.into(),
            is_active: true,
            types: vec![],
        }
    }

    #[test]
    fn database_dir_only_for_file_urls() {
        assert_eq!(database_dir("sqlite::memory:"), None);
        assert_eq!(database_dir("postgres://x/y"), None);
        assert_eq!(database_dir("sqlite:site.db"), None);
        assert_eq!(
            database_dir("sqlite://data/site.db?mode=rwc"),
            Some(Path::new("data"))
        );
        assert_eq!(
            database_dir("sqlite:/var/lib/site/site.db"),
            Some(Path::new("/var/lib/site"))
        );
    }

    #[tokio::test]
    async fn connect_creates_missing_database_dir() {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("nested/site.db");
        let store = Store::connect(&format!("sqlite://{}", path.display()), 1)
            .await
            .unwrap();
        store.migrate().await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn upsert_keeps_created_at_and_id() {
        let store = setup_store().await;
        let first = store.upsert_book(&draft("guide", "Guide", true)).await.unwrap();
        let before = store
            .get_book_by_slug("guide", Access::Admin)
            .await
            .unwrap()
            .unwrap();

        let second = store
            .upsert_book(&draft("guide", "Guide, Revised", true))
            .await
            .unwrap();
        assert_eq!(first, second);

        let after = store
            .get_book_by_slug("guide", Access::Admin)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.book.title, "Guide, Revised");
        assert_eq!(after.book.created_at, before.book.created_at);
    }

    #[tokio::test]
    async fn insert_book_reports_conflict() {
        let store = setup_store().await;
        store.insert_book(&draft("dup", "Dup", false)).await.unwrap();
        let err = store.insert_book(&draft("dup", "Dup", false)).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn admin_sees_inactive_links_public_does_not() {
        let store = setup_store().await;
        let mut hidden = link("Lulu", "https://lulu.com/b");
        hidden.is_active = false;
        store
            .save_book(
                &draft("guide", "Guide", true),
                &[link("Amazon", "https://amazon.com/x"), hidden],
            )
            .await
            .unwrap();

        let public = store
            .get_book_by_slug("guide", Access::Public)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(public.retailers.len(), 1);
        assert_eq!(public.retailers[0].name, "Amazon");

        let admin = store
            .get_book_by_slug("guide", Access::Admin)
            .await
            .unwrap()
            .unwrap();
        let names: Vec<_> = admin.retailers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Amazon", "Lulu"]);
    }

    #[tokio::test]
    async fn delete_retailer_is_restricted_while_linked() {
        let store = setup_store().await;
        let saved = store
            .save_book(&draft("guide", "Guide", true), &[link("Amazon", "https://amazon.com/x")])
            .await
            .unwrap();

        let err = store.delete_retailer("amazon").await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        store.replace_book_retailer_links(saved.id, &[]).await.unwrap();
        store.delete_retailer("amazon").await.unwrap();
        assert!(store.list_retailers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_book_cascades_to_links() {
        let store = setup_store().await;
        store
            .save_book(&draft("guide", "Guide", true), &[link("Amazon", "https://amazon.com/x")])
            .await
            .unwrap();
        store.delete_book("guide").await.unwrap();

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_retailer_link")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(remaining, 0);
        assert!(matches!(
            store.delete_book("guide").await.unwrap_err(),
            Error::NotFound
        ));
    }
}
