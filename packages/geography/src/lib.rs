#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Administrative boundary handling for the choropleth map.
//!
//! Loads region and district `GeoJSON` feature collections, drops features
//! whose geometry cannot be drawn, projects longitude/latitude into a
//! fixed viewport and serializes the projected rings as SVG path data.

pub mod features;
pub mod loader;
pub mod path;
pub mod projection;

use geo::MultiPolygon;
use statmap_geography_models::{Granularity, region_key};
use thiserror::Error;

/// Errors that can occur while loading boundary data.
#[derive(Debug, Error)]
pub enum GeoError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading a local boundary file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document is not a usable feature collection.
    #[error("Invalid feature collection: {message}")]
    InvalidCollection {
        /// Description of what went wrong.
        message: String,
    },
}

/// One drawable administrative unit.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoFeature {
    /// Display name as found in the source properties.
    pub name: String,
    /// Join key derived from the name via [`region_key`].
    pub key: String,
    /// Boundary. Single polygons are stored as a one-member multipolygon.
    pub geometry: MultiPolygon<f64>,
}

impl GeoFeature {
    /// Creates a feature, deriving its join key from `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        let name = name.into();
        let key = region_key(&name);
        Self {
            name,
            key,
            geometry,
        }
    }
}

/// Validated features of a single granularity.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollection {
    /// Which boundary set these features belong to.
    pub granularity: Granularity,
    /// Drawable features in source order.
    pub features: Vec<GeoFeature>,
    /// Number of source features dropped for unusable geometry.
    pub excluded: usize,
}

impl FeatureCollection {
    /// Whether the collection has nothing to draw.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
