use anyhow::Result;
use author_site::config::{self, Config};
use author_site::db::Store;
use author_site::web::{self, AppState};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
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

    let store = open_store(&cfg).await;
    if cfg.admin_password().is_none() {
        info!("no shared admin password configured; admin access is by login only");
    }

    let state = AppState::from_config(&cfg, store);
    let listener = tokio::net::TcpListener::bind(cfg.bind_addr()).await?;
    info!(addr = %listener.local_addr()?, "serving author site");
    axum::serve(listener, web::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("shut down");
    Ok(())
}

/// The site still serves (empty) public pages without a database.
async fn open_store(cfg: &Config) -> Option<Store> {
    let Some(url) = cfg.database_url() else {
        warn!("database.url is empty; running without a catalog");
        return None;
    };
    let store = match Store::connect(url, cfg.database.max_connections).await {
        Ok(store) => store,
        Err(err) => {
            error!(?err, "could not open database; running without a catalog");
            return None;
        }
    };
    if let Err(err) = store.migrate().await {
        error!(?err, "migrations failed; running without a catalog");
        return None;
    }
    Some(store)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(?err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
