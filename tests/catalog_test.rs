use author_site::db::Store;
use author_site::model::{Access, BookDraft, LinkDraft, ListScope};
use author_site::Error;
use serde_json::json;

async fn setup_store() -> Store {
    let store = Store::connect("sqlite::memory:", 1).await.unwrap();
    store.migrate().await.unwrap();
    store
}

fn draft(slug: &str, title: &str) -> BookDraft {
    BookDraft {
        slug: slug.into(),
        title: title.into(),
        is_published: true,
        ..Default::default()
    }
}

fn link(name: &str, url: &str) -> LinkDraft {
    LinkDraft {
        retailer_slug: author_site::slug::slugify(name),
        retailer_name: Some(name.into()),
        kind: None,
        logo_url: None,
        url: url.into(),
        is_active: true,
        types: vec![],
    }
}

async fn count(store: &Store, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(store.pool()).await.unwrap()
}

#[tokio::test]
async fn upsert_then_get_round_trips_every_field() {
    let store = setup_store().await;
    let mut d = draft("guide", "Guide");
    d.subtitle1 = Some("Forty scenarios".into());
    d.isbn = Some("978-0-00-000000-0".into());
    d.short_description = Some("Short".into());
    d.long_description = Some("Long".into());
    d.cover_image_url = Some("https://cdn.example.com/front.png".into());
    d.direct_sale_enabled = true;
    d.coming_soon = true;
    d.tags = vec!["b".into(), "a".into()];
    d.sales_metadata = json!({ "price": 1999, "currency": "USD" })
        .as_object()
        .unwrap()
        .clone();
    d.seo_title = Some("Guide | Author".into());

    let id = store.upsert_book(&d).await.unwrap();
    let got = store
        .get_book_by_slug("guide", Access::Public)
        .await
        .unwrap()
        .unwrap()
        .book;

    assert_eq!(got.id, id);
    assert_eq!(got.slug, d.slug);
    assert_eq!(got.title, d.title);
    assert_eq!(got.subtitle1, d.subtitle1);
    assert_eq!(got.subtitle2, None);
    assert_eq!(got.isbn, d.isbn);
    assert_eq!(got.short_description, d.short_description);
    assert_eq!(got.long_description, d.long_description);
    assert_eq!(got.cover_image_url, d.cover_image_url);
    assert!(got.direct_sale_enabled);
    assert!(got.is_published);
    assert!(got.coming_soon);
    assert_eq!(got.tags, vec!["b", "a"]);
    assert_eq!(got.sales_metadata, d.sales_metadata);
    assert!(got.seo.is_empty());
    assert_eq!(got.seo_title, d.seo_title);
}

#[tokio::test]
async fn second_upsert_of_a_slug_wins_without_a_second_row() {
    let store = setup_store().await;
    let first = store.upsert_book(&draft("guide", "First")).await.unwrap();
    let second = store.upsert_book(&draft("guide", "Second")).await.unwrap();
    assert_eq!(first, second);

    assert_eq!(count(&store, "SELECT COUNT(*) FROM book WHERE slug = 'guide'").await, 1);
    let got = store
        .get_book_by_slug("guide", Access::Admin)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(got.book.title, "Second");
}

#[tokio::test]
async fn replacing_with_empty_set_removes_every_link() {
    let store = setup_store().await;
    let saved = store
        .save_book(
            &draft("guide", "Guide"),
            &[
                link("Amazon", "https://amazon.com/x"),
                link("Lulu", "https://lulu.com/x"),
            ],
        )
        .await
        .unwrap();

    store.replace_book_retailer_links(saved.id, &[]).await.unwrap();

    let got = store
        .get_book_by_slug("guide", Access::Admin)
        .await
        .unwrap()
        .unwrap();
    assert!(got.retailers.is_empty());
    assert_eq!(count(&store, "SELECT COUNT(*) FROM book_retailer_link").await, 0);
    // Retailers outlive their links.
    assert_eq!(store.list_retailers().await.unwrap().len(), 2);
}

#[tokio::test]
async fn replace_links_for_missing_book_is_not_found() {
    let store = setup_store().await;
    let err = store
        .replace_book_retailer_links(42, &[link("Amazon", "https://amazon.com/x")])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound), "got {err:?}");
}

#[tokio::test]
async fn failed_link_insert_keeps_previous_links_and_book() {
    let store = setup_store().await;
    let saved = store
        .save_book(&draft("guide", "Guide"), &[link("Amazon", "https://amazon.com/x")])
        .await
        .unwrap();

    // Fails after the old links were deleted inside the transaction.
    sqlx::query(
        "CREATE TRIGGER fail_link_insert BEFORE INSERT ON book_retailer_link \
         BEGIN SELECT RAISE(ABORT, 'injected failure'); END",
    )
    .execute(store.pool())
    .await
    .unwrap();

    let err = store
        .replace_book_retailer_links(saved.id, &[link("Lulu", "https://lulu.com/x")])
        .await
        .unwrap_err();
    assert!(!err.is_client_error(), "got {err:?}");

    let err = store
        .save_book(
            &draft("guide", "Renamed"),
            &[link("Lulu", "https://lulu.com/x")],
        )
        .await
        .unwrap_err();
    assert!(!err.is_client_error(), "got {err:?}");

    let got = store
        .get_book_by_slug("guide", Access::Admin)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(got.book.title, "Guide");
    let names: Vec<_> = got.retailers.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["Amazon"]);
    assert_eq!(store.list_retailers().await.unwrap().len(), 1);
}

#[tokio::test]
async fn unpublished_book_is_hidden_from_public_callers_only() {
    let store = setup_store().await;
    let mut d = draft("draft", "Draft");
    d.is_published = false;
    d.coming_soon = true;
    store.upsert_book(&d).await.unwrap();

    assert!(store
        .get_book_by_slug("draft", Access::Public)
        .await
        .unwrap()
        .is_none());
    let admin = store
        .get_book_by_slug("draft", Access::Admin)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(admin.book.title, "Draft");
    assert!(store
        .get_book_by_slug("missing", Access::Admin)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn inactive_retailer_hides_its_links_publicly() {
    let store = setup_store().await;
    store
        .save_book(
            &draft("guide", "Guide"),
            &[
                link("Amazon", "https://amazon.com/x"),
                link("Lulu", "https://lulu.com/x"),
            ],
        )
        .await
        .unwrap();
    store.set_retailer_active("lulu", false).await.unwrap();

    let public = store
        .get_book_by_slug("guide", Access::Public)
        .await
        .unwrap()
        .unwrap();
    let names: Vec<_> = public.retailers.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["Amazon"]);

    let admin = store
        .get_book_by_slug("guide", Access::Admin)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(admin.retailers.len(), 2);
    assert!(!admin.retailers[1].retailer_active);

    let listed = store
        .list_public_books(ListScope::Published, 10)
        .await
        .unwrap();
    assert_eq!(listed[0].retailers.len(), 1);

    assert!(matches!(
        store.set_retailer_active("nope", true).await,
        Err(Error::NotFound)
    ));
}

#[tokio::test]
async fn public_listing_filters_and_orders_newest_first() {
    let store = setup_store().await;
    store.upsert_book(&draft("one", "One")).await.unwrap();
    let mut soon = draft("soon", "Soon");
    soon.is_published = false;
    soon.coming_soon = true;
    store.upsert_book(&soon).await.unwrap();
    let mut hidden = draft("hidden", "Hidden");
    hidden.is_published = false;
    store.upsert_book(&hidden).await.unwrap();
    store.upsert_book(&draft("two", "Two")).await.unwrap();

    let published: Vec<_> = store
        .list_public_books(ListScope::Published, 10)
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.book.slug)
        .collect();
    assert_eq!(published, vec!["two", "one"]);

    let live: Vec<_> = store
        .list_public_books(ListScope::Live, 10)
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.book.slug)
        .collect();
    assert_eq!(live, vec!["two", "soon", "one"]);

    let limited = store
        .list_public_books(ListScope::Live, 2)
        .await
        .unwrap();
    assert_eq!(limited.len(), 2);

    let featured = store.featured_book().await.unwrap().unwrap();
    assert_eq!(featured.book.slug, "two");
    assert_eq!(store.list_all_books(10).await.unwrap().len(), 4);
}

#[tokio::test]
async fn featured_book_is_never_unpublished() {
    let store = setup_store().await;
    let mut soon = draft("soon", "Soon");
    soon.is_published = false;
    soon.coming_soon = true;
    store.upsert_book(&soon).await.unwrap();
    assert!(store.featured_book().await.unwrap().is_none());

    let mut announced = draft("announced", "Announced");
    announced.coming_soon = true;
    store.upsert_book(&announced).await.unwrap();
    assert_eq!(
        store.featured_book().await.unwrap().unwrap().book.slug,
        "announced"
    );

    // A book already on sale wins over a newer coming-soon one.
    store.upsert_book(&draft("out-now", "Out Now")).await.unwrap();
    let mut later = draft("later", "Later");
    later.coming_soon = true;
    store.upsert_book(&later).await.unwrap();
    assert_eq!(
        store.featured_book().await.unwrap().unwrap().book.slug,
        "out-now"
    );
}

#[tokio::test]
async fn save_reports_rewritten_shared_retailers() {
    let store = setup_store().await;
    let amazon = link("Amazon", "https://amazon.com/alpha");

    let first = store
        .save_book(&draft("alpha", "Alpha"), &[amazon.clone()])
        .await
        .unwrap();
    assert!(!first.retailers_changed, "new retailer rows change no other page");

    let same = store
        .save_book(&draft("beta", "Beta"), &[amazon.clone()])
        .await
        .unwrap();
    assert!(!same.retailers_changed);

    let mut renamed = amazon.clone();
    renamed.retailer_name = Some("Amazon US".into());
    let saved = store
        .save_book(&draft("alpha", "Alpha"), &[renamed])
        .await
        .unwrap();
    assert!(saved.retailers_changed);

    let beta = store
        .get_book_by_slug("beta", Access::Public)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(beta.retailers[0].name, "Amazon US");

    let mut slug_only = amazon;
    slug_only.retailer_name = None;
    let saved = store
        .save_book(&draft("beta", "Beta"), &[slug_only])
        .await
        .unwrap();
    assert!(!saved.retailers_changed);
}

#[tokio::test]
async fn listing_cost_does_not_grow_with_result_size() {
    let store = setup_store().await;

    let before = store.statement_count();
    let empty = store
        .list_public_books(ListScope::Published, 100)
        .await
        .unwrap();
    assert!(empty.is_empty());
    let empty_cost = store.statement_count() - before;
    assert!(empty_cost <= 2, "empty listing used {empty_cost} statements");

    for i in 0..50 {
        let mut d = draft(&format!("book-{i}"), &format!("Book {i}"));
        d.is_published = i % 5 != 0;
        store
            .save_book(
                &d,
                &[
                    link("Amazon", &format!("https://amazon.com/{i}")),
                    link("Lulu", &format!("https://lulu.com/{i}")),
                ],
            )
            .await
            .unwrap();
    }

    let before = store.statement_count();
    let books = store
        .list_public_books(ListScope::Published, 100)
        .await
        .unwrap();
    let full_cost = store.statement_count() - before;

    assert_eq!(books.len(), 40);
    assert!(books.iter().all(|b| b.book.is_published));
    assert!(books.iter().all(|b| b.retailers.len() == 2));
    assert!(full_cost <= 2, "listing 40 books used {full_cost} statements");
}

#[tokio::test]
async fn concurrent_upserts_of_one_slug_leave_one_row() {
    let td = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", td.path().join("site.db").display());
    let store = Store::connect(&url, 4).await.unwrap();
    store.migrate().await.unwrap();

    let titles: Vec<String> = (0..8).map(|i| format!("Title {i}")).collect();
    let results = futures::future::join_all(titles.iter().map(|t| {
        let store = store.clone();
        let d = draft("race", t);
        async move { store.upsert_book(&d).await }
    }))
    .await;

    let ids: Vec<i64> = results.into_iter().map(|r| r.unwrap()).collect();
    assert!(ids.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(count(&store, "SELECT COUNT(*) FROM book WHERE slug = 'race'").await, 1);

    let got = store
        .get_book_by_slug("race", Access::Admin)
        .await
        .unwrap()
        .unwrap();
    assert!(titles.contains(&got.book.title));
}

#[tokio::test]
async fn retailer_referenced_by_slug_must_exist() {
    let store = setup_store().await;
    let by_slug = LinkDraft {
        retailer_slug: "amazon".into(),
        retailer_name: None,
        kind: None,
        logo_url: None,
        url: "https://amazon.com/x".into(),
        is_active: true,
        types: vec![],
    };

    let err = store
        .save_book(&draft("guide", "Guide"), &[by_slug.clone()])
        .await
        .unwrap_err();
    match err {
        Error::InvalidInput { field, .. } => assert_eq!(field, "retailers[0].slug"),
        other => panic!("expected InvalidInput, got {other:?}"),
    }
    // Nothing from the failed save was kept.
    assert_eq!(count(&store, "SELECT COUNT(*) FROM book").await, 0);

    store
        .save_book(&draft("other", "Other"), &[link("Amazon", "https://amazon.com/o")])
        .await
        .unwrap();
    store
        .save_book(&draft("guide", "Guide"), &[by_slug])
        .await
        .unwrap();
    let got = store
        .get_book_by_slug("guide", Access::Public)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(got.retailers[0].name, "Amazon");
}
