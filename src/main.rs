mod chain;
mod config;
mod constants;
mod entities;
mod events;
mod handlers;
mod ids;
mod indexer;
mod numeric;
mod rpc;
mod store;

use std::env;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use chain::RpcChainReader;
use config::{IndexerConfig, StorageKind};
use events::EventCatalog;
use handlers::{build_registry, Engine};
use indexer::Indexer;
use rpc::{RpcClient, RpcClientConfig};
use store::{EntityStore, MemoryBackend, PostgresBackend, StoreBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "config/config.json".to_string());
    let config = IndexerConfig::load(Path::new(&config_path))
        .with_context(|| format!("Failed to load config from {config_path}"))?;
    tracing::info!(network = %config.network, "loaded config");

    load_required_env_vars(&config)?;

    let backend: Arc<dyn StoreBackend> = match config.storage {
        StorageKind::Postgres => {
            let database_url = config.database_url()?;
            let backend = PostgresBackend::new(&database_url)
                .await
                .context("Failed to connect to database")?;
            backend
                .run_migrations()
                .await
                .context("Failed to run migrations")?;
            Arc::new(backend)
        }
        StorageKind::Memory => {
            tracing::warn!("Using in-memory storage, nothing will be persisted");
            Arc::new(MemoryBackend::new())
        }
    };
    let store = EntityStore::new(backend);

    let rpc_url = config.rpc_url()?;
    let rpc = Arc::new(
        RpcClient::new(RpcClientConfig::new(
            rpc_url.parse().context("Invalid RPC URL")?,
        ))
        .context("Failed to create RPC client")?,
    );
    let reader = Arc::new(RpcChainReader::new(rpc.clone()));

    let engine = Engine::new(build_registry());
    let catalog = EventCatalog::new().context("Failed to build event catalog")?;

    let indexer = Indexer::new(&config, store, rpc, reader, engine, catalog);
    indexer.run().await?;
    Ok(())
}

/// Ensures the required env vars are set, loading .env if needed.
fn load_required_env_vars(config: &IndexerConfig) -> anyhow::Result<()> {
    let mut required = vec![config.rpc_url_env_var.as_str()];
    if config.storage == StorageKind::Postgres {
        required.push(config.database_url_env_var.as_str());
    }

    let missing: Vec<&&str> = required
        .iter()
        .filter(|var| env::var(var).is_err())
        .collect();
    if missing.is_empty() {
        return Ok(());
    }

    dotenvy::dotenv()
        .with_context(|| format!("Missing env vars {missing:?} and failed to load .env file"))?;

    let still_missing: Vec<&str> = required
        .iter()
        .filter(|var| env::var(var).is_err())
        .copied()
        .collect();
    anyhow::ensure!(
        still_missing.is_empty(),
        "Missing required env vars after loading .env: {:?}",
        still_missing
    );
    Ok(())
}
