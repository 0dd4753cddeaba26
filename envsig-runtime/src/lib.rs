//! envsig Runtime
//!
//! Ties providers, normalization and geospatial filtering together:
//! - [`Aggregator`]: concurrent fan-out with per-provider deadlines
//! - [`SignalCache`]: TTL cache with single-flight refresh
//! - [`Engine`]: the query surface callers use
//! - [`EngineConfig`]: TOML configuration

pub mod aggregator;
pub mod cache;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;

pub use aggregator::*;
pub use cache::*;
pub use clock::*;
pub use config::*;
pub use engine::*;
pub use error::*;
