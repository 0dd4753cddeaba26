//! Engine errors

use std::path::PathBuf;
use thiserror::Error;

use envsig_core::GeoError;
use envsig_providers::ProviderError;

/// Errors from engine setup and queries
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Config {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid geography: {0}")]
    Geo(#[from] GeoError),

    #[error("Provider setup failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("All {0} providers failed in this cycle")]
    AllProvidersFailed(usize),

    #[error("Unknown region '{0}'")]
    InvalidRegionQuery(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
