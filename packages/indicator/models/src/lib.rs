#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Indicator dataset types.
//!
//! Statistical indicators arrive in several unrelated JSON layouts, one
//! per indicator family. Each layout has an explicit type here, and every
//! one of them is reduced to the same [`RegionValues`] result for a given
//! [`Selection`].

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use statmap_geography_models::Granularity;

// ── Periods ─────────────────────────────────────────────────────────

/// Position of a period inside its year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubPeriod {
    /// Calendar month, 1-12.
    Month(u8),
    /// Calendar quarter, 1-4.
    Quarter(u8),
}

impl SubPeriod {
    /// Last calendar month covered, used for ordering.
    const fn end_month(self) -> u8 {
        match self {
            Self::Month(m) => m,
            Self::Quarter(q) => q * 3,
        }
    }

    const fn rank(self) -> u8 {
        match self {
            Self::Month(_) => 0,
            Self::Quarter(_) => 1,
        }
    }
}

/// A year combined with a month or quarter.
///
/// Periods order by year, then by the last month they cover, so
/// `2024Q1` sorts with `2024M03`; on a tie the month sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    /// Four-digit calendar year.
    pub year: i32,
    /// Month or quarter.
    #[serde(flatten)]
    pub sub: SubPeriod,
}

impl Period {
    /// Creates a monthly period.
    #[must_use]
    pub const fn month(year: i32, month: u8) -> Self {
        Self {
            year,
            sub: SubPeriod::Month(month),
        }
    }

    /// Creates a quarterly period.
    #[must_use]
    pub const fn quarter(year: i32, quarter: u8) -> Self {
        Self {
            year,
            sub: SubPeriod::Quarter(quarter),
        }
    }

    /// Canonical compact code (`2024M03`, `2024Q2`).
    #[must_use]
    pub fn code(&self) -> String {
        match self.sub {
            SubPeriod::Month(m) => format!("{}M{m:02}", self.year),
            SubPeriod::Quarter(q) => format!("{}Q{q}", self.year),
        }
    }

    /// Long human label (`March 2024`, `Q2 2024`).
    #[must_use]
    pub fn month_label(&self) -> String {
        match self.sub {
            SubPeriod::Month(m) => {
                let name = MONTH_NAMES
                    .get(usize::from(m).wrapping_sub(1))
                    .copied()
                    .unwrap_or("Month");
                format!("{name} {}", self.year)
            }
            SubPeriod::Quarter(q) => format!("Q{q} {}", self.year),
        }
    }
}

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

impl Ord for Period {
    fn cmp(&self, other: &Self) -> Ordering {
        self.year
            .cmp(&other.year)
            .then_with(|| self.sub.end_month().cmp(&other.sub.end_month()))
            .then_with(|| self.sub.rank().cmp(&other.sub.rank()))
    }
}

impl PartialOrd for Period {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for Period {
    /// Short display label (`2024 M03`, `2024 Q2`).
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.sub {
            SubPeriod::Month(m) => write!(f, "{} M{m:02}", self.year),
            SubPeriod::Quarter(q) => write!(f, "{} Q{q}", self.year),
        }
    }
}

/// Period options for an indicator, ready for a selector widget.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSummary {
    /// Raw period codes in dataset order.
    pub periods: Vec<String>,
    /// Raw code of the latest parseable period.
    pub latest: Option<String>,
    /// Distinct years, newest first.
    pub years: Vec<i32>,
}

// ── Raw values ──────────────────────────────────────────────────────

/// A cell value as it appears in source JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// JSON number.
    Number(f64),
    /// JSON string, possibly numeric (`"4.2"`) or a missing marker (`".."`).
    Text(String),
    /// JSON `null`.
    Missing,
}

impl RawValue {
    /// Numeric interpretation of the cell.
    ///
    /// Returns `None` for missing cells, non-numeric text and non-finite
    /// numbers.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
            Self::Missing => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Text interpretation of the cell.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Number(n) => Some(n.to_string()),
            Self::Text(s) => Some(s.clone()),
            Self::Missing => None,
        }
    }
}

// ── Dataset shapes ──────────────────────────────────────────────────

/// A column descriptor in a column-coded matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixColumn {
    /// Machine code used to locate the column.
    pub code: String,
    /// Display text.
    #[serde(default)]
    pub text: Option<String>,
    /// Column role as reported by the source (`d`, `t`, `c`).
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// One row of a column-coded matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixRow {
    /// Dimension values, positionally matching the non-content columns.
    pub key: Vec<String>,
    /// Measured values.
    pub values: Vec<RawValue>,
}

/// `PxWeb`-style `{columns, data}` matrix.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnMatrixDataset {
    /// Column descriptors.
    pub columns: Vec<MatrixColumn>,
    /// Data rows.
    #[serde(default)]
    pub data: Vec<MatrixRow>,
}

/// `{ year: { region: value } }` nested map.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct YearRegionDataset {
    /// Year key to region label to value.
    pub years: BTreeMap<String, BTreeMap<String, RawValue>>,
}

/// Flat array of `{ month, <metric> }` objects, national only.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonthlySeriesDataset {
    /// One object per period.
    pub entries: Vec<BTreeMap<String, RawValue>>,
}

/// A single flat observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Raw period code.
    pub period: String,
    /// Region label; a national label marks the national total.
    pub region: String,
    /// Indicator selector, if the file mixes indicators.
    #[serde(default)]
    pub indicator: Option<String>,
    /// Sub-variable selector.
    #[serde(default)]
    pub variable: Option<String>,
    /// Measured value.
    pub value: RawValue,
}

/// Flat list of observations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservationsDataset {
    /// All observations.
    pub observations: Vec<Observation>,
}

/// A loaded dataset, one variant per source layout.
///
/// Variants carry the per-indicator settings needed to read them, so a
/// dataset can be normalized without consulting its definition again.
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorDataset {
    /// Column-coded matrix.
    ColumnMatrix {
        /// Column codes to look for.
        codes: ColumnCodes,
        /// Indicator value selected when the selection names none.
        default_indicator: Option<String>,
        /// Parsed matrix.
        matrix: ColumnMatrixDataset,
    },
    /// Nested year/region map.
    YearRegionMap(YearRegionDataset),
    /// Monthly national series.
    MonthlySeries {
        /// Field holding the period code.
        period_field: String,
        /// Field holding the value.
        metric: String,
        /// Parsed series.
        series: MonthlySeriesDataset,
    },
    /// Flat observations.
    Observations {
        /// Indicator value selected when the selection names none.
        default_indicator: Option<String>,
        /// Parsed observations.
        observations: ObservationsDataset,
    },
}

// ── Indicator configuration ─────────────────────────────────────────

/// Candidate column codes for each dimension of a column matrix.
///
/// Matching is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnCodes {
    /// Period dimension codes.
    pub period: Vec<String>,
    /// Indicator-type dimension codes.
    pub indicator: Vec<String>,
    /// Region dimension codes.
    pub region: Vec<String>,
    /// Optional sub-variable dimension codes.
    pub variable: Vec<String>,
}

impl Default for ColumnCodes {
    fn default() -> Self {
        fn codes(list: &[&str]) -> Vec<String> {
            list.iter().map(ToString::to_string).collect()
        }

        Self {
            period: codes(&["month", "quarter", "year", "period", "tid"]),
            indicator: codes(&["indicator", "indicatortype", "series", "contentscode"]),
            region: codes(&["region", "geo", "area"]),
            variable: codes(&["variable"]),
        }
    }
}

/// How an indicator's dataset file is laid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DatasetShape {
    /// Column-coded matrix.
    ColumnMatrix {
        /// Column codes to look for.
        #[serde(default)]
        columns: ColumnCodes,
        /// Value of the indicator column to select by default.
        #[serde(default)]
        indicator: Option<String>,
    },
    /// Nested `{ year: { region: value } }` map.
    YearRegionMap,
    /// Flat array of national values.
    MonthlySeries {
        /// Field holding the period code.
        #[serde(default = "period_field_default")]
        period_field: String,
        /// Field holding the value.
        metric: String,
    },
    /// Flat observation records.
    Observations {
        /// Value of `indicator` to select by default.
        #[serde(default)]
        indicator: Option<String>,
    },
}

fn period_field_default() -> String {
    "month".to_string()
}

/// A registered indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorDefinition {
    /// Unique identifier used in URLs.
    pub id: String,
    /// Human-readable name.
    pub label: String,
    /// Display unit (`%`, `GH₵ m`, …).
    #[serde(default)]
    pub unit: Option<String>,
    /// Short description.
    #[serde(default)]
    pub description: Option<String>,
    /// Dataset file, relative to the data directory.
    pub file: String,
    /// Boundary sets this indicator can be drawn on.
    #[serde(default = "default_granularities")]
    pub granularities: Vec<Granularity>,
    /// Selectable sub-variables, if any.
    #[serde(default)]
    pub variables: Vec<String>,
    /// Dataset layout.
    pub shape: DatasetShape,
}

fn default_granularities() -> Vec<Granularity> {
    vec![Granularity::Regions]
}

// ── Selection and results ───────────────────────────────────────────

/// What to extract from a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    /// Raw period code to match.
    pub period: String,
    /// Indicator selector, overriding the shape's default.
    #[serde(default)]
    pub indicator: Option<String>,
    /// Sub-variable selector.
    #[serde(default)]
    pub variable: Option<String>,
}

impl Selection {
    /// Selection for a period with no further filters.
    #[must_use]
    pub fn period(period: impl Into<String>) -> Self {
        Self {
            period: period.into(),
            ..Self::default()
        }
    }
}

/// Resolved values for one indicator and period.
///
/// Region keys are join keys (see
/// [`statmap_geography_models::region_key`]). Regions without a finite
/// value are absent. An empty region map is the normal "national figure
/// only" state, with or without a national value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionValues {
    /// Join key to value.
    pub regions: BTreeMap<String, f64>,
    /// National aggregate, if reported.
    pub national: Option<f64>,
}

impl RegionValues {
    /// Value for a join key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<f64> {
        self.regions.get(key).copied()
    }

    /// Whether there is no regional breakdown.
    #[must_use]
    pub fn is_national_only(&self) -> bool {
        self.regions.is_empty()
    }
}
