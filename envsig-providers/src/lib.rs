//! envsig Providers
//!
//! One adapter per upstream, each producing raw records of a single kind:
//! - **Seismic**: USGS FDSN earthquake catalog
//! - **Thermal**: NASA POWER daily maximum temperature
//! - **Hydrological**: river gauge feed
//! - **Soil**: ISRIC SoilGrids topsoil pH with Open-Meteo conditions
//!
//! Every adapter can run in synthetic mode, keeps its own cooldown and
//! remembers its last successful fetch. See [`traits::SignalProvider`].

pub mod client;
pub mod hydro;
pub mod seismic;
pub mod soil;
mod state;
pub mod stations;
pub mod synthetic;
pub mod thermal;
pub mod traits;

pub use client::{build_client, HttpConfig};
pub use hydro::*;
pub use seismic::*;
pub use soil::*;
pub use stations::*;
pub use thermal::*;
pub use traits::*;
