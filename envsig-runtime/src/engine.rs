//! Engine - cached aggregation with geospatial queries
//!
//! Callers never talk to providers directly. Every query goes through the
//! cache, which decides whether a new aggregation cycle is needed, and then
//! filters the cached points.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use envsig_core::{
    haversine_km, within_radius, BoundingBox, Containment, RegionBoundary, RegionTable,
    SignalKind, SignalPoint, Summary,
};
use envsig_providers::{
    build_client, HydroProvider, SeismicProvider, SignalProvider, SoilProvider, ThermalProvider,
};

use crate::aggregator::{Aggregation, Aggregator, ProviderFailure};
use crate::cache::{CacheLookup, CacheState, SignalCache};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::{EngineError, Result};

/// The full result set as served to a caller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub points: Vec<SignalPoint>,
    pub summary: Summary,
    pub errors: Vec<ProviderFailure>,
    /// Served without running a new cycle
    pub cached: bool,
    pub captured_at: DateTime<Utc>,
    pub degraded: bool,
}

impl Snapshot {
    fn from_lookup(lookup: CacheLookup<Aggregation>) -> Self {
        let aggregation = &lookup.entry.value;
        Self {
            points: aggregation.points.clone(),
            summary: aggregation.summary.clone(),
            errors: aggregation.errors.clone(),
            cached: lookup.cached,
            captured_at: lookup.entry.captured_at,
            degraded: aggregation.degraded,
        }
    }
}

/// A point with its distance from a query position
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nearby {
    pub point: SignalPoint,
    pub distance_km: f64,
}

pub struct Engine {
    aggregator: Aggregator,
    cache: SignalCache<Aggregation>,
    regions: RegionTable,
    boundary: RegionBoundary,
    buffer_deg: f64,
}

impl Engine {
    /// Build the four standard providers from configuration
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let client = build_client(&config.http)?;

        let providers: Vec<Arc<dyn SignalProvider>> = vec![
            Arc::new(SeismicProvider::new(config.seismic.clone(), client.clone())),
            Arc::new(ThermalProvider::new(config.thermal.clone(), client.clone())),
            Arc::new(HydroProvider::new(config.hydrological.clone(), client.clone())),
            Arc::new(SoilProvider::new(config.soil.clone(), client)),
        ];

        Self::with_providers(config, providers, Arc::new(SystemClock))
    }

    /// Build around caller-supplied providers and clock
    pub fn with_providers(
        config: &EngineConfig,
        providers: Vec<Arc<dyn SignalProvider>>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let boundary = config.geo.boundary()?;

        info!(
            "Engine ready: {} providers, TTL {}s, deadline {}s",
            providers.len(),
            config.cache.ttl_secs,
            config.aggregation.deadline_secs
        );

        Ok(Self {
            aggregator: Aggregator::new(providers, config.deadline()),
            cache: SignalCache::new(config.ttl(), clock),
            regions: config.geo.region_table(),
            boundary,
            buffer_deg: config.geo.border_buffer_deg(),
        })
    }

    pub fn providers(&self) -> &[Arc<dyn SignalProvider>] {
        self.aggregator.providers()
    }

    pub fn regions(&self) -> &RegionTable {
        &self.regions
    }

    pub fn boundary(&self) -> &RegionBoundary {
        &self.boundary
    }

    pub fn cache_state(&self) -> CacheState {
        self.cache.state()
    }

    async fn lookup(&self) -> CacheLookup<Aggregation> {
        self.cache
            .get_or_refresh(|| self.aggregator.aggregate())
            .await
    }

    /// All points, from cache when fresh
    pub async fn get_all(&self) -> Snapshot {
        Snapshot::from_lookup(self.lookup().await)
    }

    /// Run a new cycle regardless of the TTL
    pub async fn refresh(&self) -> Snapshot {
        let lookup = self
            .cache
            .force_refresh(|| self.aggregator.aggregate())
            .await;
        Snapshot::from_lookup(lookup)
    }

    /// Apply `filter` to the cached points
    async fn select<F>(&self, filter: F) -> Vec<SignalPoint>
    where
        F: Fn(&SignalPoint) -> bool,
    {
        let lookup = self.lookup().await;
        lookup
            .entry
            .value
            .points
            .iter()
            .filter(|&p| filter(p))
            .cloned()
            .collect()
    }

    pub async fn get_by_kind(&self, kind: SignalKind) -> Vec<SignalPoint> {
        self.select(|p| p.is_kind(kind)).await
    }

    pub async fn get_in_bounds(&self, bounds: BoundingBox) -> Vec<SignalPoint> {
        self.select(|p| bounds.contains_point(p)).await
    }

    /// Points in a named region; unknown names match nothing
    pub async fn get_by_region(&self, name: &str) -> Vec<SignalPoint> {
        match self.regions.bounds(name) {
            Some(bounds) => self.get_in_bounds(bounds).await,
            None => {
                debug!("{}", EngineError::InvalidRegionQuery(name.to_string()));
                Vec::new()
            }
        }
    }

    /// Points inside the country outline, excluding the border buffer
    pub async fn get_within_boundary(&self) -> Vec<SignalPoint> {
        self.select(|p| {
            self.boundary.classify(p.latitude, p.longitude, self.buffer_deg) == Containment::Inside
        })
        .await
    }

    /// Points within `radius_km`, nearest first
    pub async fn get_within_radius(&self, center: (f64, f64), radius_km: f64) -> Vec<Nearby> {
        let lookup = self.lookup().await;
        let mut nearby: Vec<Nearby> = within_radius(&lookup.entry.value.points, center, radius_km)
            .map(|p| Nearby {
                distance_km: haversine_km(center, p.position()),
                point: p.clone(),
            })
            .collect();
        nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        nearby
    }

    pub async fn nearest(&self, center: (f64, f64)) -> Option<Nearby> {
        let lookup = self.lookup().await;
        envsig_core::nearest(&lookup.entry.value.points, center).map(|(p, distance_km)| Nearby {
            point: p.clone(),
            distance_km,
        })
    }

    /// Summary over any subset of points
    pub fn stats(points: &[SignalPoint]) -> Summary {
        Summary::from_points(points)
    }
}
