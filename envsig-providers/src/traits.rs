//! Common traits for provider adapters

use async_trait::async_trait;
use envsig_core::{RawSignal, SignalKind};
use std::time::Duration;
use thiserror::Error;

/// Errors from provider operations
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("{provider} unavailable: {reason}")]
    Unavailable {
        provider: &'static str,
        reason: String,
    },

    #[error("{provider} returned HTTP {status}")]
    HttpStatus { provider: &'static str, status: u16 },

    #[error("{provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: &'static str,
        retry_after: Duration,
    },

    #[error("{provider} cooling down for another {remaining:?}")]
    CoolingDown {
        provider: &'static str,
        remaining: Duration,
    },

    #[error("{provider} returned a malformed payload: {reason}")]
    MalformedResponse {
        provider: &'static str,
        reason: String,
    },

    #[error("{provider} timed out")]
    Timeout { provider: &'static str },

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl ProviderError {
    /// Name of the provider that failed, if any
    pub fn provider(&self) -> Option<&'static str> {
        match self {
            ProviderError::Unavailable { provider, .. }
            | ProviderError::HttpStatus { provider, .. }
            | ProviderError::RateLimited { provider, .. }
            | ProviderError::CoolingDown { provider, .. }
            | ProviderError::MalformedResponse { provider, .. }
            | ProviderError::Timeout { provider, .. } => Some(provider),
            ProviderError::ClientBuild(_) => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited { .. } | ProviderError::CoolingDown { .. }
        )
    }
}

/// Common interface for all upstream adapters
#[async_trait]
pub trait SignalProvider: Send + Sync {
    /// Unique provider name, used in logs and errors
    fn name(&self) -> &'static str;

    /// Kind of signal this provider emits
    fn kind(&self) -> SignalKind;

    /// Provenance tag stamped on normalized records
    fn source(&self) -> &'static str;

    /// Fetch the current records from upstream
    async fn fetch(&self) -> Result<Vec<RawSignal>, ProviderError>;

    /// Last successfully fetched records, served when `fetch` fails
    fn fallback(&self) -> Vec<RawSignal> {
        Vec::new()
    }
}
