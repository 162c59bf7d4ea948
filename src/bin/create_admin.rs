use anyhow::{anyhow, Result};
use author_site::auth;
use author_site::config;
use author_site::db::Store;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(author, version, about = "Create an admin user that can log in to the site")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[arg(long)]
    email: String,

    /// At least 8 characters
    #[arg(long)]
    password: String,

    #[arg(long)]
    display_name: Option<String>,
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

    auth::validate_credentials(&args.email, &args.password)?;
    let url = cfg
        .database_url()
        .ok_or_else(|| anyhow!("database.url (or DATABASE_URL) must be set"))?;
    let store = Store::connect(url, cfg.database.max_connections).await?;
    store.migrate().await?;

    let hash = auth::hash_password(&args.password)?;
    let id = store
        .create_admin_user(&args.email, &hash, args.display_name.as_deref())
        .await?;
    info!(id, email = %args.email.trim().to_lowercase(), "created admin user");
    Ok(())
}
