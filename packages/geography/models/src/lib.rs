#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Administrative boundary types shared by the map pipeline.
//!
//! These types describe *where* things are drawn: which boundary set is
//! active, the geographic extent of that set, and the viewport it is
//! projected into. They carry no geometry themselves so that API and
//! view-model crates can depend on them without pulling in `geo`.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Boundary granularity. A single map render only ever uses one.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Granularity {
    /// First-level administrative regions.
    Regions,
    /// Second-level districts.
    Districts,
}

impl Granularity {
    /// Both granularities, regions first.
    pub const ALL: &[Self] = &[Self::Regions, Self::Districts];
}

/// Geographic extent of a feature set in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    /// Westernmost longitude.
    pub min_lon: f64,
    /// Easternmost longitude.
    pub max_lon: f64,
    /// Southernmost latitude.
    pub min_lat: f64,
    /// Northernmost latitude.
    pub max_lat: f64,
}

impl Bounds {
    /// The `[0,1] x [0,1]` fallback used when there is nothing to measure.
    pub const UNIT: Self = Self {
        min_lon: 0.0,
        max_lon: 1.0,
        min_lat: 0.0,
        max_lat: 1.0,
    };

    /// Longitude span, substituting 1 for a zero-width extent.
    #[must_use]
    pub fn lon_span(&self) -> f64 {
        non_zero_span(self.max_lon - self.min_lon)
    }

    /// Latitude span, substituting 1 for a zero-height extent.
    #[must_use]
    pub fn lat_span(&self) -> f64 {
        non_zero_span(self.max_lat - self.min_lat)
    }

    /// Grows the bounds to include another extent.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            min_lon: self.min_lon.min(other.min_lon),
            max_lon: self.max_lon.max(other.max_lon),
            min_lat: self.min_lat.min(other.min_lat),
            max_lat: self.max_lat.max(other.max_lat),
        }
    }
}

fn non_zero_span(span: f64) -> f64 {
    if span == 0.0 || !span.is_finite() {
        1.0
    } else {
        span
    }
}

/// Target drawing area for a projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    /// Width in drawing units.
    pub width: f64,
    /// Height in drawing units.
    pub height: f64,
    /// Empty margin kept on every side.
    pub padding: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 900.0,
            padding: 20.0,
        }
    }
}

/// A projected drawing coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPoint {
    /// Horizontal position, growing to the right.
    pub x: f64,
    /// Vertical position, growing downwards (north is up).
    pub y: f64,
}

/// Lifecycle of an asynchronously loaded resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "camelCase")]
pub enum LoadState<T> {
    /// Load requested, no result yet.
    Pending,
    /// Load finished successfully.
    Ready(T),
    /// Load failed. The message is meant for display.
    Unavailable(String),
}

impl<T> Default for LoadState<T> {
    fn default() -> Self {
        Self::Pending
    }
}

impl<T> LoadState<T> {
    /// Returns the loaded value, if any.
    #[must_use]
    pub const fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Pending | Self::Unavailable(_) => None,
        }
    }

    /// Whether the load is still outstanding.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Converts a fallible result into a terminal state.
    pub fn from_result<E: std::fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(e) => Self::Unavailable(e.to_string()),
        }
    }
}

/// Suffix stripped from region labels before matching.
const REGION_SUFFIX: &str = " region";

/// Normalizes an administrative unit label into the key used to join
/// indicator values onto boundary features.
///
/// Trims whitespace and removes one trailing `" Region"` (any case), so
/// `"Ashanti Region"` and `"Ashanti"` produce the same key.
#[must_use]
pub fn region_key(label: &str) -> String {
    let trimmed = label.trim();
    let lower = trimmed.to_ascii_lowercase();
    let stripped = if lower.ends_with(REGION_SUFFIX) {
        &trimmed[..trimmed.len() - REGION_SUFFIX.len()]
    } else {
        trimmed
    };
    stripped.trim().to_string()
}
