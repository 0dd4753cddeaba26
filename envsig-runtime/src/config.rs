//! Engine configuration
//!
//! Every section has defaults, so an empty file (or no file) is a valid
//! configuration. Example:
//!
//! ```toml
//! [cache]
//! ttl_secs = 120
//!
//! [hydrological]
//! endpoint = "https://gauges.example.org/levels.json"
//!
//! [[geo.regions]]
//! name = "Dhaka"
//! bounds = { south = 23.7, west = 90.3, north = 23.9, east = 90.5 }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use envsig_core::{
    default_boundary, default_regions, km_to_degrees, GeoError, NamedRegion, RegionBoundary,
    RegionTable, DEFAULT_BORDER_BUFFER_KM, DEFAULT_DEADLINE_SECS, DEFAULT_TTL_SECS,
};
use envsig_providers::{HttpConfig, HydroConfig, SeismicConfig, SoilConfig, ThermalConfig};

use crate::{EngineError, Result};

/// `chrono::Duration::seconds` rejects anything above this
const MAX_TTL_SECS: i64 = i64::MAX / 1000;

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub cache: CacheConfig,
    pub aggregation: AggregationConfig,
    pub http: HttpConfig,
    pub seismic: SeismicConfig,
    pub thermal: ThermalConfig,
    pub hydrological: HydroConfig,
    pub soil: SoilConfig,
    pub geo: GeoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds a result stays fresh
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Per-provider deadline in seconds
    pub deadline_secs: u64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            deadline_secs: DEFAULT_DEADLINE_SECS,
        }
    }
}

/// Region boxes and country outline; empty lists keep the built-in ones
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    pub border_buffer_km: f64,
    pub boundary_name: String,
    /// `[lat, lng]` vertices
    pub boundary: Vec<(f64, f64)>,
    pub regions: Vec<NamedRegion>,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            border_buffer_km: DEFAULT_BORDER_BUFFER_KM,
            boundary_name: "Bangladesh".to_string(),
            boundary: Vec::new(),
            regions: Vec::new(),
        }
    }
}

impl GeoConfig {
    pub fn border_buffer_deg(&self) -> f64 {
        km_to_degrees(self.border_buffer_km)
    }

    pub fn region_table(&self) -> RegionTable {
        if self.regions.is_empty() {
            default_regions()
        } else {
            RegionTable::from_regions(self.regions.iter().cloned())
        }
    }

    pub fn boundary(&self) -> std::result::Result<RegionBoundary, GeoError> {
        if self.boundary.is_empty() {
            default_boundary()
        } else {
            RegionBoundary::new(self.boundary_name.clone(), self.boundary.clone())
        }
    }
}

impl EngineConfig {
    /// Load from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| EngineError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| EngineError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Switch every provider to synthetic mode
    pub fn with_synthetic(mut self) -> Self {
        self.seismic.synthetic = true;
        self.thermal.synthetic = true;
        self.hydrological.synthetic = true;
        self.soil.synthetic = true;
        self
    }

    /// Cache TTL, saturating at the largest span chrono represents
    pub fn ttl(&self) -> chrono::Duration {
        let secs = i64::try_from(self.cache.ttl_secs)
            .unwrap_or(i64::MAX)
            .min(MAX_TTL_SECS);
        chrono::Duration::seconds(secs)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.aggregation.deadline_secs)
    }
}
