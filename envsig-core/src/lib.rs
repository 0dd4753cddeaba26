//! envsig Core - Canonical signal model for environmental hazard aggregation
//!
//! This crate provides the foundational primitives:
//! - Canonical [`SignalPoint`] records with kind and severity tiers
//! - Per-provider intermediate readings ([`RawSignal`])
//! - The pure normalizer/classifier
//! - Geospatial filters (bounding box, named regions, polygon, haversine)
//! - Summary statistics

pub mod signals;
pub mod readings;
pub mod normalize;
pub mod geo;
pub mod regions;
pub mod summary;

pub use signals::*;
pub use readings::*;
pub use normalize::*;
pub use geo::*;
pub use regions::*;
pub use summary::*;

/// Default cache time-to-live in seconds
pub const DEFAULT_TTL_SECS: u64 = 180;

/// Default per-provider deadline in seconds
pub const DEFAULT_DEADLINE_SECS: u64 = 20;

/// Source tag for the records substituted when every provider fails
pub const FALLBACK_SOURCE: &str = "fallback";

/// Source tag for synthetic records
pub const SYNTHETIC_SOURCE: &str = "synthetic";
