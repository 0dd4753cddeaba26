//! Monitoring stations
//!
//! One station per administrative division. Baselines are empirically tuned
//! typical values used by synthetic mode; they are not authoritative.

use serde::{Deserialize, Serialize};

/// A fixed point that point-query upstreams are asked about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// A division with its synthetic baselines
#[derive(Debug, Clone, Copy)]
pub struct Division {
    pub id: &'static str,
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
    /// Typical daily maximum temperature in °C
    pub temperature_c: f64,
    /// Typical river water level in meters
    pub water_level_m: f64,
    /// Official danger level for the division's reference gauge
    pub danger_level_m: f64,
    /// Typical topsoil pH
    pub ph: f64,
}

pub const DIVISIONS: &[Division] = &[
    Division {
        id: "dhaka",
        name: "Dhaka",
        latitude: 23.8103,
        longitude: 90.4125,
        temperature_c: 34.5,
        water_level_m: 5.2,
        danger_level_m: 6.0,
        ph: 6.6,
    },
    Division {
        id: "chittagong",
        name: "Chittagong",
        latitude: 22.3569,
        longitude: 91.7832,
        temperature_c: 32.8,
        water_level_m: 4.1,
        danger_level_m: 4.6,
        ph: 5.9,
    },
    Division {
        id: "rajshahi",
        name: "Rajshahi",
        latitude: 24.3745,
        longitude: 88.6042,
        temperature_c: 36.9,
        water_level_m: 4.8,
        danger_level_m: 6.4,
        ph: 7.6,
    },
    Division {
        id: "khulna",
        name: "Khulna",
        latitude: 22.8456,
        longitude: 89.5403,
        temperature_c: 35.2,
        water_level_m: 3.6,
        danger_level_m: 4.2,
        ph: 7.9,
    },
    Division {
        id: "barisal",
        name: "Barisal",
        latitude: 22.7010,
        longitude: 90.3535,
        temperature_c: 33.6,
        water_level_m: 3.9,
        danger_level_m: 4.3,
        ph: 7.2,
    },
    Division {
        id: "sylhet",
        name: "Sylhet",
        latitude: 24.8949,
        longitude: 91.8687,
        temperature_c: 31.9,
        water_level_m: 7.1,
        danger_level_m: 7.5,
        ph: 5.4,
    },
    Division {
        id: "rangpur",
        name: "Rangpur",
        latitude: 25.7439,
        longitude: 89.2752,
        temperature_c: 33.1,
        water_level_m: 5.8,
        danger_level_m: 6.8,
        ph: 6.2,
    },
    Division {
        id: "mymensingh",
        name: "Mymensingh",
        latitude: 24.7471,
        longitude: 90.4203,
        temperature_c: 33.4,
        water_level_m: 6.3,
        danger_level_m: 7.0,
        ph: 6.0,
    },
];

impl Division {
    pub fn station(&self) -> Station {
        Station {
            id: self.id.to_string(),
            name: self.name.to_string(),
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// One station per division
pub fn default_stations() -> Vec<Station> {
    DIVISIONS.iter().map(Division::station).collect()
}
