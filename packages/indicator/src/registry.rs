//! Compile-time registry of map indicators.
//!
//! Each entry is a `(name, toml_content)` pair embedded via `include_str!`.
//! Adding an indicator requires creating a TOML file in `indicators/` and
//! adding a corresponding entry here.

use statmap_indicator_models::IndicatorDefinition;

use crate::IndicatorError;

/// Number of registered indicators. Updated when new indicators are
/// added. Enforced by a test.
#[cfg(test)]
const EXPECTED_INDICATOR_COUNT: usize = 6;

/// Embedded TOML indicator definitions.
const INDICATOR_TOMLS: &[(&str, &str)] = &[
    ("inflation", include_str!("../indicators/inflation.toml")),
    ("population", include_str!("../indicators/population.toml")),
    ("gdp_growth", include_str!("../indicators/gdp_growth.toml")),
    ("ppi", include_str!("../indicators/ppi.toml")),
    ("unemployment", include_str!("../indicators/unemployment.toml")),
    (
        "district_poverty",
        include_str!("../indicators/district_poverty.toml"),
    ),
];

/// Returns all registered indicators.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse. Since these are
/// compile-time constants, parse failures indicate a development error
/// and are caught by the tests below.
#[must_use]
pub fn all_indicators() -> Vec<IndicatorDefinition> {
    INDICATOR_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse indicator '{name}': {e}"))
        })
        .collect()
}

/// Looks up an indicator by id.
///
/// # Errors
///
/// Returns [`IndicatorError::UnknownIndicator`] if no indicator has this id.
pub fn find_indicator(id: &str) -> Result<IndicatorDefinition, IndicatorError> {
    all_indicators()
        .into_iter()
        .find(|indicator| indicator.id == id)
        .ok_or_else(|| IndicatorError::UnknownIndicator(id.to_string()))
}
