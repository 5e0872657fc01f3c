//! Boxshelf Server Binary
//!
//! Usage: `boxshelf-server [config.toml]`. The config path may also come
//! from `BOXSHELF_CONFIG`.

use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use boxshelf_core::{DocumentStore, SqliteDocumentStore};
use boxshelf_server::auth::StaticTokenIdentity;
use boxshelf_server::config::ServerConfig;
use boxshelf_server::{serve, AppState};

fn init_tracing(config: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn open_store(config: &ServerConfig) -> Result<SqliteDocumentStore, Box<dyn std::error::Error>> {
    if config.is_in_memory() {
        tracing::warn!("Using in-memory database, nothing will be persisted");
        return Ok(SqliteDocumentStore::open_in_memory()?);
    }
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    tracing::info!("Opening database at {:?}", config.database_path);
    Ok(SqliteDocumentStore::open(&config.database_path)?)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("BOXSHELF_CONFIG").ok())
        .map(PathBuf::from);
    let config = ServerConfig::load(config_path.as_deref())?;
    init_tracing(&config);

    if config.tokens.is_empty() {
        tracing::warn!("No tokens configured, every authenticated route will reject");
    }

    let store: Arc<dyn DocumentStore> = Arc::new(open_store(&config)?);
    let identity = Arc::new(StaticTokenIdentity::new(config.tokens.clone()));
    let state = Arc::new(AppState::new(store, identity));

    serve(&config.listen_addr, state, shutdown_signal()).await
}
