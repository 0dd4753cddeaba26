//! Hydrological Adapter - river gauge feed
//!
//! There is no open machine-readable national gauge API, so the adapter reads
//! any JSON feed that lists gauges as an array of objects. Without a
//! configured feed it runs on synthetic gauge levels.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use envsig_core::{HydroReading, RawSignal, SignalKind, SYNTHETIC_SOURCE};

use crate::client::get_json;
use crate::state::{Cooldown, LastGood};
use crate::{synthetic, ProviderError, SignalProvider};

const PROVIDER: &str = "hydrological";
const SOURCE: &str = "ffwc";

/// Configuration for the hydrological adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HydroConfig {
    /// Gauge feed URL; `None` means synthetic
    pub endpoint: Option<String>,
    /// Minimum spacing between upstream calls
    pub cooldown_secs: u64,
    pub synthetic: bool,
}

impl Default for HydroConfig {
    fn default() -> Self {
        Self {
            endpoint: std::env::var("ENVSIG_HYDRO_ENDPOINT").ok(),
            cooldown_secs: 60,
            synthetic: false,
        }
    }
}

impl HydroConfig {
    fn is_synthetic(&self) -> bool {
        self.synthetic || self.endpoint.is_none()
    }
}

/// Adapter for river water levels
pub struct HydroProvider {
    config: HydroConfig,
    client: Client,
    cooldown: Cooldown,
    last_good: LastGood,
}

impl HydroProvider {
    pub fn new(config: HydroConfig, client: Client) -> Self {
        let cooldown = Cooldown::new(Duration::from_secs(config.cooldown_secs));
        Self {
            config,
            client,
            cooldown,
            last_good: LastGood::new(),
        }
    }

    async fn fetch_upstream(&self, endpoint: &str) -> Result<Vec<RawSignal>, ProviderError> {
        if let Err(remaining) = self.cooldown.try_acquire() {
            return Err(ProviderError::CoolingDown {
                provider: PROVIDER,
                remaining,
            });
        }

        let gauges: Vec<Gauge> = match get_json(PROVIDER, self.client.get(endpoint)).await {
            Ok(gauges) => gauges,
            Err(e) => {
                if let ProviderError::RateLimited { retry_after, .. } = &e {
                    self.cooldown
                        .extend((*retry_after).max(self.cooldown.window()));
                }
                return Err(e);
            }
        };

        let total = gauges.len();
        let records: Vec<RawSignal> = gauges.into_iter().filter_map(Gauge::into_reading).collect();

        if records.len() < total {
            debug!("Skipped {} gauges without a level", total - records.len());
        }
        info!("Gauge feed returned {} water levels", records.len());

        Ok(records)
    }
}

#[async_trait]
impl SignalProvider for HydroProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn kind(&self) -> SignalKind {
        SignalKind::Hydrological
    }

    fn source(&self) -> &'static str {
        if self.config.is_synthetic() {
            SYNTHETIC_SOURCE
        } else {
            SOURCE
        }
    }

    async fn fetch(&self) -> Result<Vec<RawSignal>, ProviderError> {
        let records = match self.config.endpoint.as_deref() {
            Some(endpoint) if !self.config.synthetic => self.fetch_upstream(endpoint).await?,
            _ => synthetic::hydrological(&mut rand::thread_rng()),
        };
        self.last_good.store(&records);
        Ok(records)
    }

    fn fallback(&self) -> Vec<RawSignal> {
        self.last_good.snapshot()
    }
}

/// One gauge entry in the feed
#[derive(Debug, Deserialize)]
struct Gauge {
    station_id: String,
    #[serde(default)]
    station: Option<String>,
    latitude: f64,
    longitude: f64,
    water_level_m: Option<f64>,
    #[serde(default)]
    danger_level_m: Option<f64>,
    #[serde(default)]
    observed_at: Option<DateTime<Utc>>,
}

impl Gauge {
    fn into_reading(self) -> Option<RawSignal> {
        let water_level_m = self.water_level_m?;
        Some(RawSignal::Hydrological(HydroReading {
            station: self.station.unwrap_or_else(|| self.station_id.clone()),
            station_id: self.station_id,
            latitude: self.latitude,
            longitude: self.longitude,
            water_level_m,
            danger_level_m: self.danger_level_m,
            observed_at: self.observed_at,
        }))
    }
}
