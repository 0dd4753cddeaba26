//! Aggregation Orchestrator
//!
//! One cycle fans out to every provider concurrently, waits for all of them
//! to settle (each bounded by a deadline), normalizes whatever came back and
//! merges it into one list. A failing provider only removes its own
//! contribution; when every provider fails the cycle still returns a small
//! fixed list.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use envsig_core::{
    normalize_at, Severity, SignalKind, SignalPoint, Summary, FALLBACK_SOURCE,
};
use envsig_providers::{ProviderError, SignalProvider};

use crate::EngineError;

/// A provider that failed during a cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderFailure {
    pub provider: String,
    pub error: String,
    pub rate_limited: bool,
    /// Records served from the provider's last good fetch instead
    pub recovered: usize,
}

/// Result of one aggregation cycle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregation {
    pub points: Vec<SignalPoint>,
    pub summary: Summary,
    pub errors: Vec<ProviderFailure>,
    /// The fixed fallback list stands in for real data
    pub degraded: bool,
}

/// Concurrent fan-out over the registered providers
pub struct Aggregator {
    providers: Vec<Arc<dyn SignalProvider>>,
    deadline: Duration,
}

impl Aggregator {
    pub fn new(providers: Vec<Arc<dyn SignalProvider>>, deadline: Duration) -> Self {
        Self {
            providers,
            deadline,
        }
    }

    pub fn providers(&self) -> &[Arc<dyn SignalProvider>] {
        &self.providers
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Run one cycle
    pub async fn aggregate(&self) -> Aggregation {
        let cycle = Uuid::new_v4();
        self.run_cycle()
            .instrument(info_span!("aggregate", cycle = %cycle))
            .await
    }

    async fn run_cycle(&self) -> Aggregation {
        let started = std::time::Instant::now();

        let calls = self.providers.iter().map(|provider| async move {
            let result = match timeout(self.deadline, provider.fetch()).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout {
                    provider: provider.name(),
                }),
            };
            (provider, result)
        });
        let results = join_all(calls).await;

        let now = Utc::now();
        let mut points = Vec::new();
        let mut seen = HashSet::new();
        let mut errors = Vec::new();

        for (provider, result) in results {
            let records = match result {
                Ok(records) => {
                    debug!("{} returned {} records", provider.name(), records.len());
                    records
                }
                Err(e) => {
                    let recovered = provider.fallback();
                    if matches!(e, ProviderError::CoolingDown { .. }) {
                        debug!("{} skipped: {}", provider.name(), e);
                    } else {
                        warn!("{} failed: {}", provider.name(), e);
                    }
                    errors.push(ProviderFailure {
                        provider: provider.name().to_string(),
                        error: e.to_string(),
                        rate_limited: e.is_rate_limited(),
                        recovered: recovered.len(),
                    });
                    recovered
                }
            };

            for record in &records {
                match normalize_at(record, provider.source(), now) {
                    Ok(point) => {
                        if seen.insert(point.id.clone()) {
                            points.push(point);
                        } else {
                            debug!("Dropped duplicate {}", point.id);
                        }
                    }
                    Err(e) => debug!("Dropped {} record: {}", provider.name(), e),
                }
            }
        }

        let all_failed = !self.providers.is_empty() && errors.len() == self.providers.len();
        let degraded = all_failed && points.is_empty();
        if degraded {
            warn!("{}; serving fallback list", EngineError::AllProvidersFailed(errors.len()));
            points = fallback_points(now);
        }

        let summary = Summary::from_points(&points);
        info!(
            "Aggregated {} points from {}/{} providers in {:?}",
            summary.total,
            self.providers.len() - errors.len(),
            self.providers.len(),
            started.elapsed()
        );

        Aggregation {
            points,
            summary,
            errors,
            degraded,
        }
    }
}

/// Two placeholder records served when no provider produced anything
pub fn fallback_points(now: DateTime<Utc>) -> Vec<SignalPoint> {
    vec![
        SignalPoint {
            id: format!("{}:thermal-dhaka", FALLBACK_SOURCE),
            latitude: 23.8103,
            longitude: 90.4125,
            kind: SignalKind::Thermal,
            severity: Severity::Low,
            value: 30.0,
            description: "Temperature data unavailable; showing a seasonal placeholder for Dhaka"
                .to_string(),
            observed_at: now,
            source: FALLBACK_SOURCE.to_string(),
            extra: None,
        },
        SignalPoint {
            id: format!("{}:hydro-dhaka", FALLBACK_SOURCE),
            latitude: 23.7104,
            longitude: 90.4074,
            kind: SignalKind::Hydrological,
            severity: Severity::Medium,
            value: 5.0,
            description: "River level data unavailable; showing a seasonal placeholder for the Buriganga"
                .to_string(),
            observed_at: now,
            source: FALLBACK_SOURCE.to_string(),
            extra: None,
        },
    ]
}
