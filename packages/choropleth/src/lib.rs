#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Choropleth assembly.
//!
//! Joins projected boundaries with resolved indicator values by region
//! key, colours each region through a bucketed [`ColorScale`] and
//! produces a [`ChoroplethLayer`] that can be serialized as JSON or as a
//! standalone SVG document.

pub mod color;
pub mod layer;
pub mod state;
pub mod svg;

pub use color::{ColorScale, LegendEntry};
pub use layer::{Banner, ChoroplethLayer, MapStatus, RegionShape, ValueRange, build_layer};
