//! Geospatial filters
//!
//! - Axis-aligned bounding boxes for O(1) pre-filtering
//! - Ray-casting point-in-polygon with a border buffer
//! - Haversine great-circle distance

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::SignalPoint;

/// Mean Earth radius in km
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometres per degree of latitude
pub const KM_PER_DEGREE: f64 = 111.32;

/// Default border buffer in km
pub const DEFAULT_BORDER_BUFFER_KM: f64 = 2.0;

/// Convert a distance in km to degrees of arc
pub fn km_to_degrees(km: f64) -> f64 {
    km / KM_PER_DEGREE
}

/// Errors building geographic shapes
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("polygon needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),

    #[error("vertex {index} ({lat}, {lng}) is outside WGS-84 range")]
    InvalidVertex { index: usize, lat: f64, lng: f64 },

    #[error("bounding box is inverted: south {south} > north {north}")]
    InvertedBounds { south: f64, north: f64 },
}

/// Axis-aligned latitude/longitude rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Result<Self, GeoError> {
        if south > north {
            return Err(GeoError::InvertedBounds { south, north });
        }
        Ok(Self {
            south,
            west,
            north,
            east,
        })
    }

    /// Inclusive containment on both axes
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.south && lat <= self.north && lng >= self.west && lng <= self.east
    }

    pub fn contains_point(&self, point: &SignalPoint) -> bool {
        self.contains(point.latitude, point.longitude)
    }

    /// Smallest box enclosing all vertices
    fn enclosing(vertices: &[(f64, f64)]) -> Self {
        let mut bbox = Self {
            south: f64::INFINITY,
            west: f64::INFINITY,
            north: f64::NEG_INFINITY,
            east: f64::NEG_INFINITY,
        };
        for &(lat, lng) in vertices {
            bbox.south = bbox.south.min(lat);
            bbox.north = bbox.north.max(lat);
            bbox.west = bbox.west.min(lng);
            bbox.east = bbox.east.max(lng);
        }
        bbox
    }
}

/// Outcome of a polygon containment test, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    /// Rejected by the bounding box alone
    OutsideBounds,
    /// Inside the box but the ray cast found it outside
    OutsidePolygon,
    /// Inside the polygon but closer to an edge than the border buffer
    WithinBuffer,
    Inside,
}

/// Immutable polygon of `(lat, lng)` vertices with a cached bounding box
#[derive(Debug, Clone, PartialEq)]
pub struct RegionBoundary {
    name: String,
    vertices: Vec<(f64, f64)>,
    bbox: BoundingBox,
}

impl RegionBoundary {
    pub fn new(name: impl Into<String>, vertices: Vec<(f64, f64)>) -> Result<Self, GeoError> {
        if vertices.len() < 3 {
            return Err(GeoError::TooFewVertices(vertices.len()));
        }
        for (index, &(lat, lng)) in vertices.iter().enumerate() {
            if !crate::valid_coordinates(lat, lng) {
                return Err(GeoError::InvalidVertex { index, lat, lng });
            }
        }

        let bbox = BoundingBox::enclosing(&vertices);
        Ok(Self {
            name: name.into(),
            vertices,
            bbox,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertices(&self) -> &[(f64, f64)] {
        &self.vertices
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }

    /// Box rejection, then ray cast, then the border-buffer shrink
    pub fn classify(&self, lat: f64, lng: f64, buffer_deg: f64) -> Containment {
        if !self.bbox.contains(lat, lng) {
            return Containment::OutsideBounds;
        }
        if !self.ray_cast(lat, lng) {
            return Containment::OutsidePolygon;
        }
        if self.edge_distance_deg(lat, lng) < buffer_deg {
            return Containment::WithinBuffer;
        }
        Containment::Inside
    }

    pub fn contains(&self, lat: f64, lng: f64, buffer_deg: f64) -> bool {
        self.classify(lat, lng, buffer_deg) == Containment::Inside
    }

    /// Even-odd rule with a horizontal ray towards +longitude
    fn ray_cast(&self, lat: f64, lng: f64) -> bool {
        let mut inside = false;
        let n = self.vertices.len();
        let mut j = n - 1;

        for i in 0..n {
            let (lat_i, lng_i) = self.vertices[i];
            let (lat_j, lng_j) = self.vertices[j];

            if (lat_i > lat) != (lat_j > lat) {
                let crossing = (lng_j - lng_i) * (lat - lat_i) / (lat_j - lat_i) + lng_i;
                if lng < crossing {
                    inside = !inside;
                }
            }
            j = i;
        }

        inside
    }

    /// Planar distance in degrees to the nearest edge
    fn edge_distance_deg(&self, lat: f64, lng: f64) -> f64 {
        let n = self.vertices.len();
        (0..n)
            .map(|i| segment_distance((lat, lng), self.vertices[i], self.vertices[(i + 1) % n]))
            .fold(f64::INFINITY, f64::min)
    }
}

fn segment_distance(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dy, dx) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;

    let t = if len_sq == 0.0 {
        0.0
    } else {
        (((p.0 - a.0) * dy + (p.1 - a.1) * dx) / len_sq).clamp(0.0, 1.0)
    };

    let closest = (a.0 + t * dy, a.1 + t * dx);
    ((p.0 - closest.0).powi(2) + (p.1 - closest.1).powi(2)).sqrt()
}

/// Great-circle distance in km between two `(lat, lng)` positions
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lon2) = (to.0.to_radians(), to.1.to_radians());

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Points within `radius_km` of `center`
pub fn within_radius<'a>(
    points: &'a [SignalPoint],
    center: (f64, f64),
    radius_km: f64,
) -> impl Iterator<Item = &'a SignalPoint> + 'a {
    points
        .iter()
        .filter(move |p| haversine_km(center, p.position()) <= radius_km)
}

/// The point closest to `center`, with its distance in km
pub fn nearest(points: &[SignalPoint], center: (f64, f64)) -> Option<(&SignalPoint, f64)> {
    points
        .iter()
        .map(|p| (p, haversine_km(center, p.position())))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> RegionBoundary {
        // ~2° square, roughly 220 km a side
        RegionBoundary::new(
            "square",
            vec![(22.0, 89.0), (22.0, 91.0), (24.0, 91.0), (24.0, 89.0)],
        )
        .unwrap()
    }

    #[test]
    fn test_bbox_contains_is_inclusive() {
        let bbox = BoundingBox::new(23.7, 90.3, 23.9, 90.5).unwrap();
        assert!(bbox.contains(23.75, 90.39));
        assert!(bbox.contains(23.7, 90.5));
        assert!(!bbox.contains(22.3, 91.8));
        assert!(BoundingBox::new(24.0, 90.0, 23.0, 91.0).is_err());
    }

    #[test]
    fn test_vertex_is_excluded_by_buffer() {
        let boundary = square();
        let buffer = km_to_degrees(DEFAULT_BORDER_BUFFER_KM);
        let result = boundary.classify(24.0, 89.0, buffer);
        assert!(matches!(result, Containment::WithinBuffer | Containment::OutsidePolygon));
        assert!(!boundary.contains(24.0, 89.0, buffer));
    }

    #[test]
    fn test_point_near_edge_is_buffered() {
        let boundary = square();
        let buffer = km_to_degrees(DEFAULT_BORDER_BUFFER_KM);
        // ~1 km inside the southern edge
        assert_eq!(
            boundary.classify(22.009, 90.0, buffer),
            Containment::WithinBuffer
        );
        // Without a buffer the same point is inside
        assert_eq!(boundary.classify(22.009, 90.0, 0.0), Containment::Inside);
    }

    #[test]
    fn test_point_fifty_km_inside_is_included() {
        let boundary = square();
        let buffer = km_to_degrees(DEFAULT_BORDER_BUFFER_KM);
        let lat = 22.0 + km_to_degrees(50.0);
        assert_eq!(boundary.classify(lat, 90.0, buffer), Containment::Inside);
        assert!(boundary.contains(lat, 90.0, buffer));
    }

    #[test]
    fn test_far_point_rejected_by_box() {
        let boundary = square();
        let lat = 24.0 + km_to_degrees(500.0);
        assert_eq!(boundary.classify(lat, 90.0, 0.0), Containment::OutsideBounds);
    }

    #[test]
    fn test_concave_polygon_ray_cast() {
        // U shape open to the north
        let boundary = RegionBoundary::new(
            "u",
            vec![
                (0.0, 0.0),
                (0.0, 3.0),
                (3.0, 3.0),
                (3.0, 2.0),
                (1.0, 2.0),
                (1.0, 1.0),
                (3.0, 1.0),
                (3.0, 0.0),
            ],
        )
        .unwrap();
        assert_eq!(boundary.classify(2.0, 1.5, 0.0), Containment::OutsidePolygon);
        assert_eq!(boundary.classify(2.0, 0.5, 0.0), Containment::Inside);
    }

    #[test]
    fn test_invalid_boundary() {
        assert_eq!(
            RegionBoundary::new("line", vec![(0.0, 0.0), (1.0, 1.0)]),
            Err(GeoError::TooFewVertices(2))
        );
        assert!(matches!(
            RegionBoundary::new("bad", vec![(0.0, 0.0), (95.0, 1.0), (1.0, 0.0)]),
            Err(GeoError::InvalidVertex { index: 1, .. })
        ));
    }

    #[test]
    fn test_haversine() {
        // Dhaka to Chittagong is roughly 215 km
        let d = haversine_km((23.8103, 90.4125), (22.3569, 91.7832));
        assert!((d - 215.0).abs() < 10.0, "got {}", d);

        // One degree of latitude along a meridian
        let d = haversine_km((0.0, 0.0), (1.0, 0.0));
        assert!((d - 111.19).abs() < 0.1);

        assert_eq!(haversine_km((23.0, 90.0), (23.0, 90.0)), 0.0);
    }
}
