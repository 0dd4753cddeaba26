//! Named regions and the default country boundary
//!
//! Region boxes and the boundary outline are coarse, empirically tuned
//! approximations. Both can be replaced from configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{BoundingBox, GeoError, RegionBoundary, SignalPoint};

/// A named rectangular region with optional aliases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedRegion {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub bounds: BoundingBox,
}

/// Case-insensitive lookup of named regions
#[derive(Debug, Clone, Default)]
pub struct RegionTable {
    regions: Vec<NamedRegion>,
    index: BTreeMap<String, usize>,
}

impl RegionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_regions(regions: impl IntoIterator<Item = NamedRegion>) -> Self {
        let mut table = Self::new();
        for region in regions {
            table.insert(region);
        }
        table
    }

    /// Register a region; a later region with the same name replaces the earlier one
    pub fn insert(&mut self, region: NamedRegion) {
        let slot = match self.index.get(&normalize_name(&region.name)) {
            Some(&slot) => {
                self.regions[slot] = region;
                slot
            }
            None => {
                self.regions.push(region);
                self.regions.len() - 1
            }
        };

        let region = &self.regions[slot];
        let keys: Vec<String> = std::iter::once(&region.name)
            .chain(region.aliases.iter())
            .map(|n| normalize_name(n))
            .collect();
        for key in keys {
            self.index.insert(key, slot);
        }
    }

    pub fn get(&self, name: &str) -> Option<&NamedRegion> {
        self.index
            .get(&normalize_name(name))
            .map(|&slot| &self.regions[slot])
    }

    pub fn bounds(&self, name: &str) -> Option<BoundingBox> {
        self.get(name).map(|r| r.bounds)
    }

    /// Does `point` fall in the named region? Unknown names match nothing.
    pub fn matches(&self, name: &str, point: &SignalPoint) -> bool {
        self.bounds(name)
            .is_some_and(|bounds| bounds.contains_point(point))
    }

    /// First region whose box contains the position
    pub fn locate(&self, lat: f64, lng: f64) -> Option<&NamedRegion> {
        self.regions.iter().find(|r| r.bounds.contains(lat, lng))
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedRegion> {
        self.regions.iter()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

fn region(name: &str, aliases: &[&str], south: f64, west: f64, north: f64, east: f64) -> NamedRegion {
    NamedRegion {
        name: name.to_string(),
        aliases: aliases.iter().map(|a| a.to_string()).collect(),
        bounds: BoundingBox {
            south,
            west,
            north,
            east,
        },
    }
}

/// Division city boxes used when configuration supplies none
pub fn default_regions() -> RegionTable {
    RegionTable::from_regions([
        region("Dhaka", &[], 23.7, 90.3, 23.9, 90.5),
        region("Chittagong", &["Chattogram"], 22.2, 91.7, 22.4, 91.9),
        region("Rajshahi", &[], 24.3, 88.5, 24.45, 88.7),
        region("Khulna", &[], 22.75, 89.45, 22.9, 89.65),
        region("Barisal", &["Barishal"], 22.6, 90.3, 22.8, 90.45),
        region("Sylhet", &[], 24.85, 91.8, 24.95, 91.95),
        region("Rangpur", &[], 25.7, 89.2, 25.8, 89.3),
        region("Mymensingh", &[], 24.7, 90.35, 24.8, 90.45),
    ])
}

/// Simplified Bangladesh outline, clockwise from the north-west corner
pub const BANGLADESH_OUTLINE: &[(f64, f64)] = &[
    (26.63, 88.55),
    (26.30, 89.10),
    (26.02, 89.85),
    (25.25, 90.00),
    (25.20, 90.60),
    (25.15, 91.60),
    (25.20, 92.40),
    (24.60, 92.30),
    (24.10, 91.95),
    (23.70, 91.20),
    (23.00, 91.40),
    (23.20, 91.80),
    (23.70, 92.25),
    (22.90, 92.50),
    (21.80, 92.60),
    (20.75, 92.30),
    (21.45, 91.95),
    (22.30, 91.75),
    (22.80, 91.10),
    (21.85, 90.30),
    (21.70, 89.60),
    (21.65, 89.10),
    (22.60, 88.95),
    (23.20, 88.80),
    (24.20, 88.70),
    (24.45, 88.10),
    (24.80, 88.10),
    (25.20, 88.50),
    (25.50, 88.15),
    (26.00, 88.15),
    (26.45, 88.35),
];

/// The default country boundary
pub fn default_boundary() -> Result<RegionBoundary, GeoError> {
    RegionBoundary::new("Bangladesh", BANGLADESH_OUTLINE.to_vec())
}
