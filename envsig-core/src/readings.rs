//! Provider-specific intermediate records
//!
//! Adapters deserialize their upstream wire format into one of these
//! readings. The normalizer pattern-matches on [`RawSignal`] to build the
//! canonical [`crate::SignalPoint`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SignalKind;

/// An earthquake from a seismic catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeismicReading {
    /// Catalog event id
    pub event_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub magnitude: f64,
    pub depth_km: Option<f64>,
    /// Free-text location, e.g. "12 km NNE of Sylhet, Bangladesh"
    pub place: Option<String>,
    pub significance: Option<u32>,
    pub observed_at: Option<DateTime<Utc>>,
}

/// A maximum surface temperature reading at a monitoring station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalReading {
    pub station_id: String,
    pub station: String,
    pub latitude: f64,
    pub longitude: f64,
    pub temperature_c: f64,
    pub humidity: Option<f64>,
    pub observed_at: Option<DateTime<Utc>>,
}

/// A river gauge water level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydroReading {
    pub station_id: String,
    pub station: String,
    pub latitude: f64,
    pub longitude: f64,
    pub water_level_m: f64,
    pub danger_level_m: Option<f64>,
    pub observed_at: Option<DateTime<Utc>>,
}

/// A topsoil chemistry sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilReading {
    pub site_id: String,
    pub site: String,
    pub latitude: f64,
    pub longitude: f64,
    pub ph: f64,
    pub moisture: Option<f64>,
    pub soil_temperature: Option<f64>,
    pub observed_at: Option<DateTime<Utc>>,
}

/// A semi-normalized record tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RawSignal {
    Seismic(SeismicReading),
    Thermal(ThermalReading),
    Hydrological(HydroReading),
    Soil(SoilReading),
}

impl RawSignal {
    pub fn kind(&self) -> SignalKind {
        match self {
            RawSignal::Seismic(_) => SignalKind::Seismic,
            RawSignal::Thermal(_) => SignalKind::Thermal,
            RawSignal::Hydrological(_) => SignalKind::Hydrological,
            RawSignal::Soil(_) => SignalKind::Soil,
        }
    }

    /// Upstream identifier, unique within one provider
    pub fn upstream_id(&self) -> &str {
        match self {
            RawSignal::Seismic(r) => &r.event_id,
            RawSignal::Thermal(r) => &r.station_id,
            RawSignal::Hydrological(r) => &r.station_id,
            RawSignal::Soil(r) => &r.site_id,
        }
    }

    pub fn position(&self) -> (f64, f64) {
        match self {
            RawSignal::Seismic(r) => (r.latitude, r.longitude),
            RawSignal::Thermal(r) => (r.latitude, r.longitude),
            RawSignal::Hydrological(r) => (r.latitude, r.longitude),
            RawSignal::Soil(r) => (r.latitude, r.longitude),
        }
    }

    /// Primary measurement in the kind's unit
    pub fn value(&self) -> f64 {
        match self {
            RawSignal::Seismic(r) => r.magnitude,
            RawSignal::Thermal(r) => r.temperature_c,
            RawSignal::Hydrological(r) => r.water_level_m,
            RawSignal::Soil(r) => r.ph,
        }
    }

    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        match self {
            RawSignal::Seismic(r) => r.observed_at,
            RawSignal::Thermal(r) => r.observed_at,
            RawSignal::Hydrological(r) => r.observed_at,
            RawSignal::Soil(r) => r.observed_at,
        }
    }
}
