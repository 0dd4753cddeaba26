//! Synthetic mode
//!
//! Fabricates records with the same shape an upstream would return, varied
//! randomly around the division baselines. Ids are stable per division so
//! consecutive cycles replace rather than accumulate records.

use chrono::{Duration, Utc};
use rand::Rng;

use envsig_core::{HydroReading, RawSignal, SeismicReading, SoilReading, ThermalReading};

use crate::DIVISIONS;

/// A handful of recent earthquakes scattered around the divisions
pub fn seismic<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<RawSignal> {
    let now = Utc::now();

    (0..count)
        .map(|i| {
            let division = &DIVISIONS[i % DIVISIONS.len()];
            let magnitude: f64 = rng.gen_range(2.5..7.5);
            RawSignal::Seismic(SeismicReading {
                event_id: format!("seismic-{}-{}", division.id, i),
                latitude: division.latitude + rng.gen_range(-0.8..0.8),
                longitude: division.longitude + rng.gen_range(-0.8..0.8),
                magnitude: round(magnitude, 1),
                depth_km: Some(round(rng.gen_range(5.0..70.0), 1)),
                place: Some(format!("near {}", division.name)),
                significance: Some((magnitude * magnitude * 20.0) as u32),
                observed_at: Some(now - Duration::minutes(rng.gen_range(5..2880))),
            })
        })
        .collect()
}

/// Daily maximum temperature per division
pub fn thermal<R: Rng + ?Sized>(rng: &mut R) -> Vec<RawSignal> {
    let now = Utc::now();

    DIVISIONS
        .iter()
        .map(|d| {
            RawSignal::Thermal(ThermalReading {
                station_id: format!("thermal-{}", d.id),
                station: d.name.to_string(),
                latitude: d.latitude,
                longitude: d.longitude,
                temperature_c: round(d.temperature_c + rng.gen_range(-3.0..6.0), 1),
                humidity: Some(round(rng.gen_range(55.0..90.0), 0)),
                observed_at: Some(now),
            })
        })
        .collect()
}

/// Reference gauge level per division
pub fn hydrological<R: Rng + ?Sized>(rng: &mut R) -> Vec<RawSignal> {
    let now = Utc::now();

    DIVISIONS
        .iter()
        .map(|d| {
            RawSignal::Hydrological(HydroReading {
                station_id: format!("hydro-{}", d.id),
                station: d.name.to_string(),
                latitude: d.latitude,
                longitude: d.longitude,
                water_level_m: round(d.water_level_m + rng.gen_range(-1.5..2.5), 2),
                danger_level_m: Some(d.danger_level_m),
                observed_at: Some(now),
            })
        })
        .collect()
}

/// Topsoil chemistry per division
pub fn soil<R: Rng + ?Sized>(rng: &mut R) -> Vec<RawSignal> {
    let now = Utc::now();

    DIVISIONS
        .iter()
        .map(|d| {
            RawSignal::Soil(SoilReading {
                site_id: format!("soil-{}", d.id),
                site: d.name.to_string(),
                latitude: d.latitude,
                longitude: d.longitude,
                ph: round(d.ph + rng.gen_range(-0.6..0.6), 1),
                moisture: Some(round(rng.gen_range(0.12..0.45), 2)),
                soil_temperature: Some(round(rng.gen_range(24.0..34.0), 1)),
                observed_at: Some(now),
            })
        })
        .collect()
}

fn round(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_synthetic_shapes() {
        let mut rng = StdRng::seed_from_u64(7);

        let quakes = seismic(&mut rng, 5);
        assert_eq!(quakes.len(), 5);
        for quake in &quakes {
            let value = quake.value();
            assert!((2.5..=7.5).contains(&value), "magnitude {}", value);
        }

        assert_eq!(thermal(&mut rng).len(), DIVISIONS.len());
        assert_eq!(hydrological(&mut rng).len(), DIVISIONS.len());

        for reading in soil(&mut rng) {
            let ph = reading.value();
            assert!((4.5..=8.5).contains(&ph), "pH {}", ph);
        }
    }

    #[test]
    fn test_ids_are_stable_across_cycles() {
        let mut rng = StdRng::seed_from_u64(1);
        let first: Vec<String> = thermal(&mut rng)
            .iter()
            .map(|r| r.upstream_id().to_string())
            .collect();
        let second: Vec<String> = thermal(&mut rng)
            .iter()
            .map(|r| r.upstream_id().to_string())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_round() {
        assert_eq!(round(3.14159, 2), 3.14);
        assert_eq!(round(7.25, 0), 7.0);
    }
}
