//! Soil Adapter - ISRIC SoilGrids with Open-Meteo conditions
//!
//! SoilGrids supplies topsoil pH per station. Current moisture and soil
//! temperature come from Open-Meteo on a best-effort basis: a failure there
//! only leaves the extra fields empty. SoilGrids is slow and strict about
//! request rates, so calls are spaced by a cooldown.

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use envsig_core::{RawSignal, SignalKind, SoilReading, SYNTHETIC_SOURCE};

use crate::client::get_json;
use crate::state::{Cooldown, LastGood};
use crate::{default_stations, synthetic, ProviderError, SignalProvider, Station};

const PROVIDER: &str = "soil";
const SOURCE: &str = "soilgrids";

/// Configuration for the soil adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SoilConfig {
    /// SoilGrids properties query endpoint
    pub endpoint: String,
    /// Open-Meteo forecast endpoint for current conditions
    pub conditions_endpoint: String,
    pub stations: Vec<Station>,
    pub cooldown_secs: u64,
    pub synthetic: bool,
}

impl Default for SoilConfig {
    fn default() -> Self {
        Self {
            endpoint: std::env::var("ENVSIG_SOIL_ENDPOINT").unwrap_or_else(|_| {
                "https://rest.isric.org/soilgrids/v2.0/properties/query".to_string()
            }),
            conditions_endpoint: "https://api.open-meteo.com/v1/forecast".to_string(),
            stations: default_stations(),
            cooldown_secs: 120,
            synthetic: false,
        }
    }
}

/// Adapter for topsoil pH
pub struct SoilProvider {
    config: SoilConfig,
    client: Client,
    cooldown: Cooldown,
    last_good: LastGood,
}

impl SoilProvider {
    pub fn new(config: SoilConfig, client: Client) -> Self {
        let cooldown = Cooldown::new(Duration::from_secs(config.cooldown_secs));
        Self {
            config,
            client,
            cooldown,
            last_good: LastGood::new(),
        }
    }

    async fn fetch_ph(&self, station: &Station) -> Result<Option<f64>, ProviderError> {
        let request = self.client.get(&self.config.endpoint).query(&[
            ("lon", station.longitude.to_string()),
            ("lat", station.latitude.to_string()),
            ("property", "phh2o".to_string()),
            ("depth", "0-5cm".to_string()),
            ("value", "mean".to_string()),
        ]);

        let response: SoilGridsResponse = get_json(PROVIDER, request).await?;
        Ok(response.topsoil_ph())
    }

    async fn fetch_conditions(&self, station: &Station) -> Option<CurrentConditions> {
        let request = self.client.get(&self.config.conditions_endpoint).query(&[
            ("latitude", station.latitude.to_string()),
            ("longitude", station.longitude.to_string()),
            (
                "current",
                "soil_temperature_0cm,soil_moisture_0_to_1cm".to_string(),
            ),
        ]);

        match get_json::<ConditionsResponse>(PROVIDER, request).await {
            Ok(response) => Some(response.current),
            Err(e) => {
                debug!("Soil conditions for {} unavailable: {}", station.name, e);
                None
            }
        }
    }

    async fn fetch_station(&self, station: &Station) -> Result<Option<RawSignal>, ProviderError> {
        let (ph, conditions) =
            futures::join!(self.fetch_ph(station), self.fetch_conditions(station));

        let Some(ph) = ph? else {
            return Ok(None);
        };
        let conditions = conditions.unwrap_or_default();

        Ok(Some(RawSignal::Soil(SoilReading {
            site_id: station.id.clone(),
            site: station.name.clone(),
            latitude: station.latitude,
            longitude: station.longitude,
            ph,
            moisture: conditions.soil_moisture_0_to_1cm,
            soil_temperature: conditions.soil_temperature_0cm,
            observed_at: None,
        })))
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
                Ok(None) => warn!("SoilGrids has no pH for {}", station.name),
                Err(e) => {
                    warn!("SoilGrids request for {} failed: {}", station.name, e);
                    if let ProviderError::RateLimited { retry_after, .. } = &e {
                        self.cooldown
                            .extend((*retry_after).max(self.cooldown.window()));
                    }
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if records.is_empty() => Err(e),
            _ => {
                info!(
                    "SoilGrids returned pH for {}/{} stations",
                    records.len(),
                    self.config.stations.len()
                );
                Ok(records)
            }
        }
    }
}

#[async_trait]
impl SignalProvider for SoilProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn kind(&self) -> SignalKind {
        SignalKind::Soil
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
            synthetic::soil(&mut rand::thread_rng())
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

// SoilGrids response types
#[derive(Debug, Deserialize)]
struct SoilGridsResponse {
    properties: SoilGridsProperties,
}

#[derive(Debug, Deserialize)]
struct SoilGridsProperties {
    #[serde(default)]
    layers: Vec<Layer>,
}

#[derive(Debug, Deserialize)]
struct Layer {
    name: String,
    unit_measure: UnitMeasure,
    #[serde(default)]
    depths: Vec<Depth>,
}

#[derive(Debug, Deserialize)]
struct UnitMeasure {
    /// Stored values are scaled integers; divide to get the target unit
    d_factor: f64,
}

#[derive(Debug, Deserialize)]
struct Depth {
    values: DepthValues,
}

#[derive(Debug, Deserialize)]
struct DepthValues {
    mean: Option<f64>,
}

impl SoilGridsResponse {
    /// pH in water for the 0-5 cm layer
    fn topsoil_ph(&self) -> Option<f64> {
        let layer = self.properties.layers.iter().find(|l| l.name == "phh2o")?;
        if layer.unit_measure.d_factor <= 0.0 {
            return None;
        }
        let mean = layer.depths.first()?.values.mean?;
        Some(mean / layer.unit_measure.d_factor)
    }
}

// Open-Meteo response types
#[derive(Debug, Deserialize)]
struct ConditionsResponse {
    current: CurrentConditions,
}

#[derive(Debug, Default, Deserialize)]
struct CurrentConditions {
    soil_temperature_0cm: Option<f64>,
    soil_moisture_0_to_1cm: Option<f64>,
}
