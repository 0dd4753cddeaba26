//! Seismic Adapter - USGS FDSN event catalog
//!
//! Queries recent earthquakes inside a bounding box as GeoJSON. The catalog
//! throttles aggressive clients, so calls are spaced by a cooldown window
//! which a 429 response extends.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use envsig_core::{BoundingBox, RawSignal, SeismicReading, SignalKind, SYNTHETIC_SOURCE};

use crate::client::get_json;
use crate::state::{Cooldown, LastGood};
use crate::{synthetic, ProviderError, SignalProvider};

const PROVIDER: &str = "seismic";
const SOURCE: &str = "usgs";

/// Configuration for the seismic adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeismicConfig {
    /// FDSN event query endpoint
    pub endpoint: String,
    /// Area of interest
    pub bounds: BoundingBox,
    /// Smallest magnitude to request
    pub min_magnitude: f64,
    /// How far back to look, in days
    pub lookback_days: i64,
    /// Maximum events per query
    pub limit: u32,
    /// Minimum spacing between upstream calls
    pub cooldown_secs: u64,
    /// Fabricate records instead of calling upstream
    pub synthetic: bool,
    /// Number of synthetic events per cycle
    pub synthetic_events: usize,
}

impl Default for SeismicConfig {
    fn default() -> Self {
        Self {
            endpoint: std::env::var("ENVSIG_SEISMIC_ENDPOINT")
                .unwrap_or_else(|_| "https://earthquake.usgs.gov/fdsnws/event/1/query".to_string()),
            bounds: BoundingBox {
                south: 20.0,
                west: 87.0,
                north: 27.5,
                east: 93.5,
            },
            min_magnitude: 2.5,
            lookback_days: 30,
            limit: 100,
            cooldown_secs: 60,
            synthetic: false,
            synthetic_events: 6,
        }
    }
}

/// Adapter for the USGS earthquake catalog
pub struct SeismicProvider {
    config: SeismicConfig,
    client: Client,
    cooldown: Cooldown,
    last_good: LastGood,
}

impl SeismicProvider {
    pub fn new(config: SeismicConfig, client: Client) -> Self {
        let cooldown = Cooldown::new(Duration::from_secs(config.cooldown_secs));
        Self {
            config,
            client,
            cooldown,
            last_good: LastGood::new(),
        }
    }

    fn query_params(&self, now: DateTime<Utc>) -> Vec<(&'static str, String)> {
        let start = now - ChronoDuration::days(self.config.lookback_days);
        let b = &self.config.bounds;
        vec![
            ("format", "geojson".to_string()),
            ("starttime", start.format("%Y-%m-%d").to_string()),
            ("minmagnitude", self.config.min_magnitude.to_string()),
            ("minlatitude", b.south.to_string()),
            ("maxlatitude", b.north.to_string()),
            ("minlongitude", b.west.to_string()),
            ("maxlongitude", b.east.to_string()),
            ("limit", self.config.limit.to_string()),
            ("orderby", "time".to_string()),
        ]
    }

    fn synthesize(&self) -> Vec<RawSignal> {
        synthetic::seismic(&mut rand::thread_rng(), self.config.synthetic_events)
    }

    async fn fetch_upstream(&self) -> Result<Vec<RawSignal>, ProviderError> {
        if let Err(remaining) = self.cooldown.try_acquire() {
            return Err(ProviderError::CoolingDown {
                provider: PROVIDER,
                remaining,
            });
        }

        let request = self
            .client
            .get(&self.config.endpoint)
            .query(&self.query_params(Utc::now()));

        let collection: FeatureCollection = match get_json(PROVIDER, request).await {
            Ok(collection) => collection,
            Err(e) => {
                if let ProviderError::RateLimited { retry_after, .. } = &e {
                    self.cooldown
                        .extend((*retry_after).max(self.cooldown.window()));
                }
                return Err(e);
            }
        };

        let total = collection.features.len();
        let records: Vec<RawSignal> = collection
            .features
            .into_iter()
            .filter_map(parse_feature)
            .collect();

        if records.len() < total {
            debug!(
                "Skipped {} USGS features without magnitude or coordinates",
                total - records.len()
            );
        }
        info!("USGS returned {} earthquakes", records.len());

        Ok(records)
    }
}

#[async_trait]
impl SignalProvider for SeismicProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn kind(&self) -> SignalKind {
        SignalKind::Seismic
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

fn parse_feature(feature: Feature) -> Option<RawSignal> {
    let magnitude = feature.properties.mag?;
    let coordinates = feature.geometry?.coordinates;
    let (longitude, latitude) = match coordinates.as_slice() {
        [lng, lat, ..] => (*lng, *lat),
        _ => return None,
    };

    Some(RawSignal::Seismic(SeismicReading {
        event_id: feature.id,
        latitude,
        longitude,
        magnitude,
        depth_km: coordinates.get(2).copied(),
        place: feature.properties.place,
        significance: feature.properties.sig,
        observed_at: feature
            .properties
            .time
            .and_then(DateTime::<Utc>::from_timestamp_millis),
    }))
}

// USGS GeoJSON response types
#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    id: String,
    properties: FeatureProperties,
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct FeatureProperties {
    mag: Option<f64>,
    place: Option<String>,
    /// Milliseconds since the Unix epoch
    time: Option<i64>,
    sig: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Vec<f64>,
}
