//! HTTP client shared by the adapters
//!
//! Builds one `reqwest` client and maps transport, status and decode
//! failures onto [`ProviderError`].

use reqwest::{header::RETRY_AFTER, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::ProviderError;

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// User agent sent to every upstream
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            user_agent: format!("envsig/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Create the HTTP client used by every adapter
pub fn build_client(config: &HttpConfig) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(&config.user_agent)
        .build()
        .map_err(|e| ProviderError::ClientBuild(e.to_string()))
}

/// Fallback delay when a 429 carries no usable `Retry-After`
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Send a request and decode a JSON body
pub async fn get_json<T: DeserializeOwned>(
    provider: &'static str,
    request: RequestBuilder,
) -> Result<T, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| transport_error(provider, e))?;

    let response = check_status(provider, response)?;

    let body = response
        .text()
        .await
        .map_err(|e| transport_error(provider, e))?;

    decode(provider, &body)
}

/// Decode a JSON payload, reporting shape failures as malformed
pub fn decode<T: DeserializeOwned>(provider: &'static str, body: &str) -> Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|e| {
        debug!("{} payload did not decode: {}", provider, e);
        ProviderError::MalformedResponse {
            provider,
            reason: e.to_string(),
        }
    })
}

fn check_status(provider: &'static str, response: Response) -> Result<Response, ProviderError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after)
            .unwrap_or(DEFAULT_RETRY_AFTER);
        return Err(ProviderError::RateLimited {
            provider,
            retry_after,
        });
    }

    if !status.is_success() {
        return Err(ProviderError::HttpStatus {
            provider,
            status: status.as_u16(),
        });
    }

    Ok(response)
}

/// `Retry-After` in its delta-seconds form
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn transport_error(provider: &'static str, e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout { provider }
    } else if e.is_decode() {
        ProviderError::MalformedResponse {
            provider,
            reason: e.to_string(),
        }
    } else {
        ProviderError::Unavailable {
            provider,
            reason: e.to_string(),
        }
    }
}
