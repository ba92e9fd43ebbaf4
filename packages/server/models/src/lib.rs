#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the statmap server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the indicator and geography types to allow independent evolution
//! of the API contract.

use serde::{Deserialize, Serialize};
use statmap_geography_models::Granularity;
use statmap_indicator_models::{DatasetShape, IndicatorDefinition, PeriodSummary};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Always `true` while the server is up.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Whether an indicator's dataset could be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DatasetStatus {
    /// Loaded and ready to map.
    Ready,
    /// Still loading.
    Pending,
    /// Failed to load.
    Unavailable,
}

/// A registered indicator as listed by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiIndicator {
    /// Identifier used in map URLs.
    pub id: String,
    /// Display name.
    pub label: String,
    /// Display unit.
    pub unit: Option<String>,
    /// Short description.
    pub description: Option<String>,
    /// Boundary sets the indicator can be drawn on.
    pub granularities: Vec<Granularity>,
    /// Selectable sub-variables.
    pub variables: Vec<String>,
    /// Source layout name.
    pub shape: String,
    /// Dataset availability.
    pub status: DatasetStatus,
}

impl ApiIndicator {
    /// Builds the listing entry for `definition`.
    #[must_use]
    pub fn new(definition: &IndicatorDefinition, status: DatasetStatus) -> Self {
        let shape = match definition.shape {
            DatasetShape::ColumnMatrix { .. } => "column_matrix",
            DatasetShape::YearRegionMap => "year_region_map",
            DatasetShape::MonthlySeries { .. } => "monthly_series",
            DatasetShape::Observations { .. } => "observations",
        };
        Self {
            id: definition.id.clone(),
            label: definition.label.clone(),
            unit: definition.unit.clone(),
            description: definition.description.clone(),
            granularities: definition.granularities.clone(),
            variables: definition.variables.clone(),
            shape: shape.to_string(),
            status,
        }
    }
}

/// One selectable period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPeriod {
    /// Raw code to pass back as `period`.
    pub code: String,
    /// Short label (`2024 M03`), if the code parses.
    pub label: Option<String>,
    /// Long label (`March 2024`), if the code parses.
    pub long_label: Option<String>,
}

/// Periods of one indicator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPeriods {
    /// Indicator id.
    pub indicator: String,
    /// Periods in dataset order.
    pub periods: Vec<ApiPeriod>,
    /// Raw code of the latest period.
    pub latest: Option<String>,
    /// Distinct years, newest first.
    pub years: Vec<i32>,
}

impl ApiPeriods {
    /// Builds the response from a summary, labelling codes with `label`.
    #[must_use]
    pub fn new(
        indicator: impl Into<String>,
        summary: PeriodSummary,
        label: impl Fn(&str) -> Option<(String, String)>,
    ) -> Self {
        let periods = summary
            .periods
            .into_iter()
            .map(|code| {
                let (short, long) = label(&code).unzip();
                ApiPeriod {
                    code,
                    label: short,
                    long_label: long,
                }
            })
            .collect();

        Self {
            indicator: indicator.into(),
            periods,
            latest: summary.latest,
            years: summary.years,
        }
    }
}

/// Output format of the map endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapFormat {
    /// `MapStatus` as JSON.
    #[default]
    Json,
    /// Standalone SVG document.
    Svg,
}

/// Query parameters for the map endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapQueryParams {
    /// Raw period code; defaults to the latest available.
    pub period: Option<String>,
    /// Indicator selector for mixed datasets.
    pub indicator: Option<String>,
    /// Sub-variable selector.
    pub variable: Option<String>,
    /// Response format.
    #[serde(default)]
    pub format: MapFormat,
}

/// Query parameters for the statistics proxy.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxyQueryParams {
    /// Serve from and store into the response cache.
    #[serde(default)]
    pub cache: bool,
}

/// Query parameters for the download endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadParams {
    /// Object key.
    pub key: String,
    /// Requested URL lifetime in seconds.
    pub expires: Option<u64>,
}

/// A presigned download link.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDownload {
    /// Object key.
    pub key: String,
    /// Time-limited URL.
    pub url: String,
    /// Lifetime actually granted, in seconds.
    pub expires_in: u64,
}

/// A statistical program and its downloadable publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiProgram {
    /// Program name.
    pub name: String,
    /// Short description.
    pub description: Option<String>,
    /// Matched storage key.
    pub key: Option<String>,
    /// Link to request a download URL, if a publication was found.
    pub download_url: Option<String>,
}
