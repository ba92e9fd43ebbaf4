//! Joining boundaries with values.

use std::sync::Arc;

use serde::Serialize;
use statmap_geography::FeatureCollection;
use statmap_geography::path::build_path_d;
use statmap_geography::projection::{Projector, compute_bounds};
use statmap_geography_models::{Granularity, LoadState, Viewport};
use statmap_indicator_models::RegionValues;
use strum_macros::AsRefStr;

use crate::color::{ColorScale, LegendEntry};

/// One drawable region with its resolved value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionShape {
    /// Display name from the boundary file.
    pub name: String,
    /// Join key.
    pub key: String,
    /// SVG path data.
    pub path: String,
    /// Resolved value, if the dataset has one for this region.
    pub value: Option<f64>,
    /// Fill colour.
    pub fill: String,
}

/// Notice shown above the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, AsRefStr)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "kebab-case")]
pub enum Banner {
    /// At least one region has a value.
    #[default]
    None,
    /// No region has a value; only the national figure (if any) is shown.
    NationalOnly,
}

impl Banner {
    /// Text to display, if any.
    #[must_use]
    pub const fn message(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::NationalOnly => {
                Some("Regional breakdown not available. Showing the national figure.")
            }
        }
    }
}

/// Minimum and maximum of the values on the drawn regions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueRange {
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
}

impl ValueRange {
    /// Range of the finite `values`, or `None` if there are none.
    #[must_use]
    pub fn observed(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |range, v| match range {
                None => Some(Self { min: v, max: v }),
                Some(r) => Some(Self {
                    min: r.min.min(v),
                    max: r.max.max(v),
                }),
            })
    }
}

/// A fully resolved choropleth for one granularity, indicator and period.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoroplethLayer {
    /// Boundary set drawn.
    pub granularity: Granularity,
    /// Viewport width.
    pub width: f64,
    /// Viewport height.
    pub height: f64,
    /// Regions in boundary-file order.
    pub shapes: Vec<RegionShape>,
    /// National aggregate.
    pub national: Option<f64>,
    /// Range the colours were computed over.
    pub range: Option<ValueRange>,
    /// Legend rows.
    pub legend: Vec<LegendEntry>,
    /// Notice state.
    pub banner: Banner,
    /// Boundary features dropped for unusable geometry.
    pub excluded: usize,
}

/// Builds the layer for `collection` coloured by `values`.
#[must_use]
pub fn build_layer(
    collection: &FeatureCollection,
    values: &RegionValues,
    scale: &ColorScale,
    viewport: Viewport,
) -> ChoroplethLayer {
    let projector = Projector::new(compute_bounds(&collection.features), viewport);

    let joined: Vec<Option<f64>> = collection
        .features
        .iter()
        .map(|feature| values.get(&feature.key))
        .collect();
    let range = ValueRange::observed(joined.iter().flatten().copied());

    let shapes: Vec<RegionShape> = collection
        .features
        .iter()
        .zip(joined)
        .map(|(feature, value)| {
            let fill = match (value, range) {
                (Some(v), Some(r)) => scale.color_for(v, r.min, r.max),
                _ => scale.no_data_color(),
            };
            RegionShape {
                name: feature.name.clone(),
                key: feature.key.clone(),
                path: build_path_d(&feature.geometry, &projector),
                value,
                fill: fill.to_string(),
            }
        })
        .collect();

    let matched = shapes.iter().filter(|s| s.value.is_some()).count();
    log::debug!(
        "Built {} layer: {matched}/{} regions with values",
        collection.granularity,
        shapes.len()
    );

    let banner = if matched == 0 {
        Banner::NationalOnly
    } else {
        Banner::None
    };

    ChoroplethLayer {
        granularity: collection.granularity,
        width: viewport.width,
        height: viewport.height,
        shapes,
        national: values.national,
        range,
        legend: range
            .map(|r| scale.legend(r.min, r.max))
            .unwrap_or_default(),
        banner,
        excluded: collection.excluded,
    }
}

/// What the map view should show.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "camelCase")]
pub enum MapStatus {
    /// Boundaries or data still loading.
    Loading,
    /// Something failed; the message is shown in place of the map.
    Unavailable(String),
    /// Ready to draw.
    Ready(Arc<ChoroplethLayer>),
}

impl MapStatus {
    /// Combines boundary and value states.
    ///
    /// Failure on either side wins over loading; the layer is only built
    /// once both sides are ready.
    pub fn resolve(
        boundaries: &LoadState<Arc<FeatureCollection>>,
        values: &LoadState<RegionValues>,
        build: impl FnOnce(&FeatureCollection, &RegionValues) -> Arc<ChoroplethLayer>,
    ) -> Self {
        match (boundaries, values) {
            (LoadState::Unavailable(message), _) | (_, LoadState::Unavailable(message)) => {
                Self::Unavailable(message.clone())
            }
            (LoadState::Ready(collection), LoadState::Ready(values)) => {
                Self::Ready(build(collection, values))
            }
            _ => Self::Loading,
        }
    }

    /// The layer, if ready.
    #[must_use]
    pub fn layer(&self) -> Option<&ChoroplethLayer> {
        match self {
            Self::Ready(layer) => Some(layer.as_ref()),
            _ => None,
        }
    }
}
