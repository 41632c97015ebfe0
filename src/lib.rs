//! Seasonal SWB (soil-water-balance) zonal statistics per HUC10 watershed,
//! differenced against the historical baseline and cached as parquet.

pub mod config;
pub mod data;
pub mod error;

pub use config::Config;
pub use error::{Error, Result};
