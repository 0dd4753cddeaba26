//! Thermal Adapter - NASA POWER daily point data
//!
//! Asks for the daily maximum 2 m temperature and relative humidity at each
//! monitoring station. POWER publishes with a lag of a few days and marks
//! missing days with a fill value, so the latest real day in a short window
//! is used. POWER throttles bursts of point requests, so each cycle of
//! station calls is spaced by a cooldown.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use envsig_core::{RawSignal, SignalKind, ThermalReading, SYNTHETIC_SOURCE};

use crate::client::get_json;
use crate::state::{Cooldown, LastGood};
use crate::{default_stations, synthetic, ProviderError, SignalProvider, Station};

const PROVIDER: &str = "thermal";
const SOURCE: &str = "nasa-power";

/// POWER marks missing values with -999
const FILL_VALUE_FLOOR: f64 = -900.0;

/// Configuration for the thermal adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalConfig {
    /// POWER daily point endpoint
    pub endpoint: String,
    /// Days of history to request
    pub window_days: i64,
    pub stations: Vec<Station>,
    pub cooldown_secs: u64,
    /// Fabricate records instead of calling upstream
    pub synthetic: bool,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            endpoint: std::env::var("ENVSIG_THERMAL_ENDPOINT").unwrap_or_else(|_| {
                "https://power.larc.nasa.gov/api/temporal/daily/point".to_string()
            }),
            window_days: 10,
            stations: default_stations(),
            cooldown_secs: 60,
            synthetic: false,
        }
    }
}

/// Adapter for surface temperature readings
pub struct ThermalProvider {
    config: ThermalConfig,
    client: Client,
    cooldown: Cooldown,
    last_good: LastGood,
}

impl ThermalProvider {
    pub fn new(config: ThermalConfig, client: Client) -> Self {
        let cooldown = Cooldown::new(std::time::Duration::from_secs(config.cooldown_secs));
        Self {
            config,
            client,
            cooldown,
            last_good: LastGood::new(),
        }
    }

    fn synthesize(&self) -> Vec<RawSignal> {
        synthetic::thermal(&mut rand::thread_rng())
    }

    async fn fetch_station(&self, station: &Station) -> Result<Option<RawSignal>, ProviderError> {
        let end = Utc::now();
        let start = end - Duration::days(self.config.window_days);

        let request = self.client.get(&self.config.endpoint).query(&[
            ("parameters", "T2M_MAX,RH2M".to_string()),
            ("community", "AG".to_string()),
            ("latitude", station.latitude.to_string()),
            ("longitude", station.longitude.to_string()),
            ("start", start.format("%Y%m%d").to_string()),
            ("end", end.format("%Y%m%d").to_string()),
            ("format", "JSON".to_string()),
        ]);

        let response: PowerResponse = get_json(PROVIDER, request).await?;
        Ok(parse_power(station, response))
    }

    async fn fetch_upstream(&self) -> Result<Vec<RawSignal>, ProviderError> {
        if let Err(remaining) = self.cooldown.try_acquire() {
            return Err(ProviderError::CoolingDown {
                provider: PROVIDER,
                remaining,
            });
        }

        let results = join_all(self.config.stations.iter().map(|s| self.fetch_station(s))).await;

        let mut records = Vec::new();
        let mut first_error = None;

        for (station, result) in self.config.stations.iter().zip(results) {
            match result {
                Ok(Some(record)) => records.push(record),
                Ok(None) => warn!("POWER has no recent temperature for {}", station.name),
                Err(e) => {
                    warn!("POWER request for {} failed: {}", station.name, e);
                    if let ProviderError::RateLimited { retry_after, .. } = &e {
                        self.cooldown
                            .extend((*retry_after).max(self.cooldown.window()));
                    }
                    first_error.get_or_insert(e);
                }
            }
        }

        // Partial station coverage still counts as success
        match first_error {
            Some(e) if records.is_empty() => Err(e),
            _ => {
                info!(
                    "POWER returned temperatures for {}/{} stations",
                    records.len(),
                    self.config.stations.len()
                );
                Ok(records)
            }
        }
    }
}

#[async_trait]
impl SignalProvider for ThermalProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn kind(&self) -> SignalKind {
        SignalKind::Thermal
    }

    fn source(&self) -> &'static str {
        if self.config.synthetic {
            SYNTHETIC_SOURCE
        } else {
            SOURCE
        }
    }

    async fn fetch(&self) -> Result<Vec<RawSignal>, ProviderError> {
        let records = if self.config.synthetic {
            self.synthesize()
        } else {
            self.fetch_upstream().await?
        };
        self.last_good.store(&records);
        Ok(records)
    }

    fn fallback(&self) -> Vec<RawSignal> {
        self.last_good.snapshot()
    }
}

/// Latest day with a real temperature value
fn parse_power(station: &Station, response: PowerResponse) -> Option<RawSignal> {
    let parameters = response.properties.parameter;

    let (day, temperature_c) = parameters
        .t2m_max
        .iter()
        .rev()
        .find(|(_, &v)| v > FILL_VALUE_FLOOR)
        .map(|(day, &v)| (day.clone(), v))?;

    let humidity = parameters
        .rh2m
        .get(&day)
        .copied()
        .filter(|&v| v > FILL_VALUE_FLOOR);

    Some(RawSignal::Thermal(ThermalReading {
        station_id: format!("{}-{}", station.id, day),
        station: station.name.clone(),
        latitude: station.latitude,
        longitude: station.longitude,
        temperature_c,
        humidity,
        observed_at: parse_day(&day),
    }))
}

fn parse_day(day: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(day, "%Y%m%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

// NASA POWER response types
#[derive(Debug, Deserialize)]
struct PowerResponse {
    properties: PowerProperties,
}

#[derive(Debug, Deserialize)]
struct PowerProperties {
    parameter: PowerParameters,
}

/// Date keys are `YYYYMMDD`, so map order is chronological
#[derive(Debug, Deserialize)]
struct PowerParameters {
    #[serde(rename = "T2M_MAX", default)]
    t2m_max: BTreeMap<String, f64>,
    #[serde(rename = "RH2M", default)]
    rh2m: BTreeMap<String, f64>,
}
