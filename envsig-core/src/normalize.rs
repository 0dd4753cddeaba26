//! Normalizer/classifier
//!
//! Turns a [`RawSignal`] into a canonical [`SignalPoint`]. Pure: no I/O, and
//! the same raw input always yields the same point. The only exception is a
//! raw record without a timestamp, which is stamped with the current time;
//! [`normalize_at`] takes that time explicitly.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{signal_id, RawSignal, Severity, SignalExtra, SignalPoint};

/// Reasons a raw record is dropped instead of stored
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("invalid coordinates ({lat}, {lng}) for {id}")]
    InvalidCoordinates { id: String, lat: f64, lng: f64 },

    #[error("non-finite measurement for {0}")]
    InvalidValue(String),
}

/// Normalize with the current time as the fallback observation timestamp
pub fn normalize(raw: &RawSignal, source: &str) -> Result<SignalPoint, NormalizeError> {
    normalize_at(raw, source, Utc::now())
}

/// Normalize a raw record, stamping `now` when it carries no timestamp
pub fn normalize_at(
    raw: &RawSignal,
    source: &str,
    now: DateTime<Utc>,
) -> Result<SignalPoint, NormalizeError> {
    let id = signal_id(source, raw.upstream_id());
    let (latitude, longitude) = raw.position();

    if !valid_coordinates(latitude, longitude) {
        return Err(NormalizeError::InvalidCoordinates {
            id,
            lat: latitude,
            lng: longitude,
        });
    }

    let value = raw.value();
    if !value.is_finite() {
        return Err(NormalizeError::InvalidValue(id));
    }

    let kind = raw.kind();
    let (description, extra) = describe(raw);

    Ok(SignalPoint {
        id,
        latitude,
        longitude,
        kind,
        severity: Severity::classify(kind, value),
        value,
        description,
        observed_at: raw.observed_at().unwrap_or(now),
        source: source.to_string(),
        extra: if extra.is_empty() { None } else { Some(extra) },
    })
}

/// WGS-84 range check; NaN fails both comparisons
pub fn valid_coordinates(lat: f64, lng: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)
}

fn describe(raw: &RawSignal) -> (String, SignalExtra) {
    match raw {
        RawSignal::Seismic(r) => {
            let description = match &r.place {
                Some(place) => format!("M{:.1} earthquake - {}", r.magnitude, place),
                None => format!("M{:.1} earthquake", r.magnitude),
            };
            let extra = SignalExtra {
                depth_km: r.depth_km,
                significance: r.significance,
                ..Default::default()
            };
            (description, extra)
        }
        RawSignal::Thermal(r) => {
            let mut description = format!("Max temperature {:.1}°C at {}", r.temperature_c, r.station);
            if let Some(humidity) = r.humidity {
                description.push_str(&format!(" ({:.0}% RH)", humidity));
            }
            let extra = SignalExtra {
                humidity: r.humidity,
                ..Default::default()
            };
            (description, extra)
        }
        RawSignal::Hydrological(r) => {
            let description = match r.danger_level_m {
                Some(danger) if r.water_level_m >= danger => format!(
                    "Water level {:.2} m at {}, {:.2} m above danger level",
                    r.water_level_m,
                    r.station,
                    r.water_level_m - danger
                ),
                _ => format!("Water level {:.2} m at {}", r.water_level_m, r.station),
            };
            let extra = SignalExtra {
                danger_level_m: r.danger_level_m,
                ..Default::default()
            };
            (description, extra)
        }
        RawSignal::Soil(r) => {
            let tendency = if r.ph < 7.0 {
                "acidic"
            } else if r.ph > 7.0 {
                "alkaline"
            } else {
                "neutral"
            };
            let description = format!("Soil pH {:.1} ({}) at {}", r.ph, tendency, r.site);
            let extra = SignalExtra {
                moisture: r.moisture,
                soil_temperature: r.soil_temperature,
                ..Default::default()
            };
            (description, extra)
        }
    }
}
