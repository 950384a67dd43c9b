//! Indexer configuration, loaded from a JSON file with env var indirection
//! for connection strings.

mod network;

use std::path::Path;

use alloy::primitives::Address;
use serde::Deserialize;
use thiserror::Error;

pub use network::Network;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    ParseError {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(String),

    #[error("Environment variable '{0}' is not set")]
    MissingEnvVar(String),
}

/// Which `StoreBackend` to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Postgres,
    Memory,
}

fn default_range_size() -> u64 {
    2000
}

fn default_rpc_url_env_var() -> String {
    "RPC_URL".to_string()
}

fn default_database_url_env_var() -> String {
    "DATABASE_URL".to_string()
}

#[derive(Debug, Deserialize)]
pub struct IndexerConfig {
    pub network: Network,
    #[serde(default = "default_rpc_url_env_var")]
    pub rpc_url_env_var: String,
    #[serde(default = "default_database_url_env_var")]
    pub database_url_env_var: String,
    pub storage: StorageKind,
    pub pool_registry: Address,
    pub oracle: Address,
    #[serde(default)]
    pub shortfall: Option<Address>,
    #[serde(default)]
    pub rewards_distributors: Vec<Address>,
    /// Overrides the network's default deployment block.
    #[serde(default)]
    pub start_block: Option<u64>,
    #[serde(default = "default_range_size")]
    pub range_size: u64,
}

impl IndexerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn start_block(&self) -> u64 {
        self.start_block
            .unwrap_or_else(|| self.network.default_start_block())
    }

    pub fn rpc_url(&self) -> Result<String, ConfigError> {
        std::env::var(&self.rpc_url_env_var)
            .map_err(|_| ConfigError::MissingEnvVar(self.rpc_url_env_var.clone()))
    }

    pub fn database_url(&self) -> Result<String, ConfigError> {
        std::env::var(&self.database_url_env_var)
            .map_err(|_| ConfigError::MissingEnvVar(self.database_url_env_var.clone()))
    }
}
