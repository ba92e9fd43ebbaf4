//! Value to colour bucketing.

use serde::Serialize;

/// Sequential blues, lightest first.
pub const DEFAULT_PALETTE: [&str; 5] = ["#eff3ff", "#bdd7e7", "#6baed6", "#3182bd", "#08519c"];

/// Fill for regions without a value.
pub const NO_DATA_COLOR: &str = "#d9d9d9";

/// A fixed ordered palette plus a distinct no-data colour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorScale {
    palette: Vec<String>,
    no_data: String,
}

impl Default for ColorScale {
    fn default() -> Self {
        Self {
            palette: DEFAULT_PALETTE.iter().map(ToString::to_string).collect(),
            no_data: NO_DATA_COLOR.to_string(),
        }
    }
}

/// One legend row: a colour and the value interval it covers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendEntry {
    /// Bucket colour.
    pub color: String,
    /// Lower bound (inclusive).
    pub from: f64,
    /// Upper bound.
    pub to: f64,
}

impl ColorScale {
    /// Creates a scale from an explicit palette.
    ///
    /// Returns `None` if `palette` is empty.
    #[must_use]
    pub fn new(palette: Vec<String>, no_data: impl Into<String>) -> Option<Self> {
        if palette.is_empty() {
            return None;
        }
        Some(Self {
            palette,
            no_data: no_data.into(),
        })
    }

    /// Number of buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.palette.len()
    }

    /// Always `false`; a scale has at least one bucket.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.palette.is_empty()
    }

    /// Colour used for missing values.
    #[must_use]
    pub fn no_data_color(&self) -> &str {
        &self.no_data
    }

    /// Bucket for `value` within `[min, max]`.
    ///
    /// A degenerate range always maps to the middle bucket. Values outside
    /// the range are clamped, and `value == max` lands in the last bucket.
    /// Returns `None` for non-finite values.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn bucket_index(&self, value: f64, min: f64, max: f64) -> Option<usize> {
        if !value.is_finite() {
            return None;
        }

        let len = self.len();
        let span = max - min;
        if !span.is_finite() || span <= 0.0 {
            return Some(len / 2);
        }

        let t = ((value - min) / span).clamp(0.0, 1.0);
        Some(((t * len as f64).floor() as usize).min(len - 1))
    }

    /// Fill colour for `value` within `[min, max]`.
    #[must_use]
    pub fn color_for(&self, value: f64, min: f64, max: f64) -> &str {
        self.bucket_index(value, min, max)
            .and_then(|i| self.palette.get(i))
            .map_or(self.no_data.as_str(), String::as_str)
    }

    /// Legend rows for a value range.
    ///
    /// A degenerate range has a single row with the middle colour.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn legend(&self, min: f64, max: f64) -> Vec<LegendEntry> {
        let span = max - min;
        if !span.is_finite() || span <= 0.0 {
            return vec![LegendEntry {
                color: self.palette[self.len() / 2].clone(),
                from: min,
                to: max,
            }];
        }

        let step = span / self.len() as f64;
        self.palette
            .iter()
            .enumerate()
            .map(|(i, color)| LegendEntry {
                color: color.clone(),
                from: (i as f64).mul_add(step, min),
                to: if i + 1 == self.len() {
                    max
                } else {
                    ((i + 1) as f64).mul_add(step, min)
                },
            })
            .collect()
    }
}
