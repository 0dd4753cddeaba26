//! Canonical environmental signal records
//!
//! Every provider's output ends up as a [`SignalPoint`]:
//! - A stable `source:upstream-id` identifier
//! - WGS-84 coordinates
//! - A kind and a severity tier derived from the primary measurement
//! - Optional secondary measurements in [`SignalExtra`]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kinds of environmental hazard signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    /// Earthquake magnitude
    Seismic,
    /// Surface temperature in °C
    Thermal,
    /// River or gauge water level in meters
    Hydrological,
    /// Soil pH
    Soil,
}

impl SignalKind {
    /// All kinds, in display order
    pub const ALL: [SignalKind; 4] = [
        SignalKind::Seismic,
        SignalKind::Thermal,
        SignalKind::Hydrological,
        SignalKind::Soil,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Seismic => "seismic",
            SignalKind::Thermal => "thermal",
            SignalKind::Hydrological => "hydrological",
            SignalKind::Soil => "soil",
        }
    }

    /// Unit of the primary measurement
    pub fn unit(&self) -> &'static str {
        match self {
            SignalKind::Seismic => "M",
            SignalKind::Thermal => "°C",
            SignalKind::Hydrological => "m",
            SignalKind::Soil => "pH",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a kind name is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown signal kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for SignalKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "seismic" | "earthquake" => Ok(SignalKind::Seismic),
            "thermal" | "temperature" | "heat" => Ok(SignalKind::Thermal),
            "hydrological" | "hydro" | "water" | "flood" => Ok(SignalKind::Hydrological),
            "soil" => Ok(SignalKind::Soil),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// Ordered severity tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    /// Classify a primary measurement into a tier.
    ///
    /// Each tier's lower bound is inclusive, so a boundary value lands in the
    /// higher tier. Soil pH is graded by distance from neutral on both tails.
    pub fn classify(kind: SignalKind, value: f64) -> Severity {
        match kind {
            SignalKind::Seismic => ascending(value, 4.0, 6.0, 7.0),
            SignalKind::Thermal => ascending(value, 36.0, 39.0, 42.0),
            SignalKind::Hydrological => ascending(value, 4.5, 6.5, 8.0),
            SignalKind::Soil => soil_ph(value),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn ascending(value: f64, medium: f64, high: f64, critical: f64) -> Severity {
    if value >= critical {
        Severity::Critical
    } else if value >= high {
        Severity::High
    } else if value >= medium {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn soil_ph(ph: f64) -> Severity {
    // Distance from neutral, so both tails share the same boundaries
    let deviation = (ph - 7.0).abs();
    if deviation >= 1.5 {
        Severity::Critical
    } else if deviation >= 1.0 {
        Severity::High
    } else if deviation >= 0.5 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Kind-specific secondary measurements
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalExtra {
    /// Hypocentre depth in km (seismic)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_km: Option<f64>,
    /// Upstream significance score (seismic)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub significance: Option<u32>,
    /// Relative humidity in % (thermal)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    /// Official danger level in meters (hydrological)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub danger_level_m: Option<f64>,
    /// Volumetric soil moisture in m³/m³ (soil)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moisture: Option<f64>,
    /// Soil temperature in °C (soil)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soil_temperature: Option<f64>,
}

impl SignalExtra {
    pub fn is_empty(&self) -> bool {
        *self == SignalExtra::default()
    }
}

/// A normalized environmental observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalPoint {
    /// `<source>:<upstream id>`, stable across refresh cycles
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub kind: SignalKind,
    pub severity: Severity,
    /// Primary measurement in the kind's unit
    pub value: f64,
    pub description: String,
    /// When the underlying observation was made (not fetch time)
    pub observed_at: DateTime<Utc>,
    /// Upstream provider tag
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<SignalExtra>,
}

impl SignalPoint {
    /// `(latitude, longitude)` pair for the geo helpers
    pub fn position(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    pub fn is_kind(&self, kind: SignalKind) -> bool {
        self.kind == kind
    }
}

/// Compose the canonical identifier for an upstream record
pub fn signal_id(source: &str, upstream_id: &str) -> String {
    format!("{}:{}", source, upstream_id)
}
