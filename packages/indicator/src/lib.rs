#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Indicator data for the choropleth map.
//!
//! Holds the compile-time indicator registry, reads dataset files into
//! [`IndicatorDataset`](statmap_indicator_models::IndicatorDataset)
//! values, parses period codes and reduces any dataset to per-region
//! values for one period.

pub mod dataset;
pub mod normalize;
pub mod period;
pub mod registry;

use thiserror::Error;

/// Errors that can occur while loading indicator data.
#[derive(Debug, Error)]
pub enum IndicatorError {
    /// Reading a dataset file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The dataset is not valid JSON or does not match its declared shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No indicator is registered under this id.
    #[error("Unknown indicator: {0}")]
    UnknownIndicator(String),
}
