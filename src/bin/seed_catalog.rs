use anyhow::{anyhow, Result};
use author_site::cache::NoCache;
use author_site::config;
use author_site::db::Store;
use author_site::model::Access;
use author_site::pipeline::{self, BookPayload, RetailerPayload};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Save the default catalog book and its retailer links (idempotent)"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Mark the book published instead of coming soon
    #[arg(long)]
    publish: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let url = cfg
        .database_url()
        .ok_or_else(|| anyhow!("database.url (or DATABASE_URL) must be set"))?;
    let store = Store::connect(url, cfg.database.max_connections).await?;
    store.migrate().await?;

    let payload = default_book(args.publish);
    let saved = pipeline::save_book(Some(&store), Access::Admin, &payload, &NoCache).await?;
    info!(id = saved.id, slug = %saved.slug, "seeded catalog");
    Ok(())
}

fn default_book(publish: bool) -> BookPayload {
    BookPayload {
        slug: Some("guide-to-psilocybin-integration".into()),
        title: Some("Guide to Psilocybin Integration".into()),
        subtitle1: Some(
            "40 Real Scenarios for Navigating What You See, Feel & Experience".into(),
        ),
        short_description: Some(
            "A compassionate, practical guide to integrating psilocybin experiences into everyday life."
                .into(),
        ),
        long_description: Some(
            "This book offers 40 real-world scenarios to help navigate psilocybin journeys.".into(),
        ),
        is_published: Some(publish),
        coming_soon: Some(!publish),
        tags: Some(vec!["integration".into(), "psilocybin".into()]),
        retailers: Some(vec![
            RetailerPayload {
                name: Some("Amazon".into()),
                slug: Some("amazon".into()),
                kind: Some("ebook_print".into()),
                url: Some("https://www.amazon.com/dp/B0EXAMPLE".into()),
                types: Some(vec!["ebook".into(), "print".into()]),
                ..Default::default()
            },
            RetailerPayload {
                name: Some("Lulu".into()),
                slug: Some("lulu".into()),
                kind: Some("print".into()),
                url: Some("https://www.lulu.com/shop/example".into()),
                types: Some(vec!["print".into()]),
                ..Default::default()
            },
        ]),
        ..Default::default()
    }
}
