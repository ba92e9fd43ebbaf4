//! Reduction of every dataset shape to [`RegionValues`].
//!
//! Region labels are turned into join keys with [`region_key`] so that
//! `"Ashanti Region"` in a table meets `"Ashanti"` on the map. Labels that
//! denote the whole country go to the national slot instead of the region
//! map. Cells that do not hold a finite number are left out entirely.

use std::collections::BTreeSet;

use statmap_geography_models::region_key;
use statmap_indicator_models::{
    ColumnCodes, ColumnMatrixDataset, IndicatorDataset, MatrixRow, MonthlySeriesDataset,
    Observation, ObservationsDataset, RawValue, RegionValues, Selection, YearRegionDataset,
};

/// Whether a region label stands for the national total.
#[must_use]
pub fn is_national_label(label: &str) -> bool {
    let label = label.trim().to_lowercase();
    label == "national" || label.contains("ghana")
}

/// Resolves region values for the selected period.
///
/// A period with no matching rows yields empty regions and no national
/// value; that is not an error.
#[must_use]
pub fn normalize(dataset: &IndicatorDataset, selection: &Selection) -> RegionValues {
    match dataset {
        IndicatorDataset::ColumnMatrix {
            codes,
            default_indicator,
            matrix,
        } => normalize_matrix(matrix, codes, default_indicator.as_deref(), selection),
        IndicatorDataset::YearRegionMap(years) => normalize_year_map(years, selection),
        IndicatorDataset::MonthlySeries {
            period_field,
            metric,
            series,
        } => normalize_series(series, period_field, metric, selection),
        IndicatorDataset::Observations {
            default_indicator,
            observations,
        } => normalize_observations(observations, default_indicator.as_deref(), selection),
    }
}

/// Distinct raw period codes in first-seen order.
///
/// Year-keyed datasets report their year keys.
#[must_use]
pub fn available_periods(dataset: &IndicatorDataset) -> Vec<String> {
    let codes: Vec<String> = match dataset {
        IndicatorDataset::ColumnMatrix { codes, matrix, .. } => {
            let Some(index) = MatrixIndex::new(matrix, codes).period else {
                return Vec::new();
            };
            matrix
                .data
                .iter()
                .filter_map(|row| row.key.get(index).cloned())
                .collect()
        }
        IndicatorDataset::YearRegionMap(years) => years.years.keys().cloned().collect(),
        IndicatorDataset::MonthlySeries {
            period_field,
            series,
            ..
        } => series
            .entries
            .iter()
            .filter_map(|entry| entry.get(period_field)?.as_text())
            .collect(),
        IndicatorDataset::Observations { observations, .. } => observations
            .observations
            .iter()
            .map(|o| o.period.clone())
            .collect(),
    };

    let mut seen = BTreeSet::new();
    codes
        .into_iter()
        .map(|code| code.trim().to_string())
        .filter(|code| !code.is_empty() && seen.insert(code.clone()))
        .collect()
}

fn same_code(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Routes one labelled value to the national slot or the region map.
fn record(values: &mut RegionValues, label: &str, value: Option<f64>) {
    let Some(value) = value else {
        return;
    };
    if is_national_label(label) {
        values.national = Some(value);
    } else {
        let key = region_key(label);
        if !key.is_empty() {
            values.regions.insert(key, value);
        }
    }
}

// ── Column matrix ───────────────────────────────────────────────────

/// Positions of each dimension within a row's `key`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct MatrixIndex {
    period: Option<usize>,
    indicator: Option<usize>,
    region: Option<usize>,
    variable: Option<usize>,
}

impl MatrixIndex {
    /// Locates dimension columns.
    ///
    /// Content columns (`type = "c"`) carry values, not keys, so they are
    /// skipped when counting key positions.
    fn new(matrix: &ColumnMatrixDataset, codes: &ColumnCodes) -> Self {
        let key_columns: Vec<&str> = matrix
            .columns
            .iter()
            .filter(|c| !c.kind.as_deref().is_some_and(|k| k.eq_ignore_ascii_case("c")))
            .map(|c| c.code.as_str())
            .collect();

        let find = |candidates: &[String]| {
            candidates.iter().find_map(|candidate| {
                key_columns
                    .iter()
                    .position(|code| same_code(code, candidate))
            })
        };

        Self {
            period: find(&codes.period),
            indicator: find(&codes.indicator),
            region: find(&codes.region),
            variable: find(&codes.variable),
        }
    }
}

fn key_matches(key: &[String], index: Option<usize>, wanted: Option<&str>) -> bool {
    match (index, wanted) {
        (Some(index), Some(wanted)) => key.get(index).is_some_and(|v| same_code(v, wanted)),
        _ => true,
    }
}

fn normalize_matrix(
    matrix: &ColumnMatrixDataset,
    codes: &ColumnCodes,
    default_indicator: Option<&str>,
    selection: &Selection,
) -> RegionValues {
    let index = MatrixIndex::new(matrix, codes);
    let mut values = RegionValues::default();

    let rows: Vec<&MatrixRow> = matrix
        .data
        .iter()
        .filter(|row| key_matches(&row.key, index.period, Some(&selection.period)))
        .collect();

    // A dimension without a selector is pinned to its first listed value so
    // that rows of different series never overwrite each other.
    let first_listed = |position: Option<usize>| {
        let position = position?;
        rows.iter().find_map(|row| row.key.get(position)).cloned()
    };
    let indicator = selection
        .indicator
        .clone()
        .or_else(|| default_indicator.map(ToString::to_string))
        .or_else(|| first_listed(index.indicator));
    let variable = selection
        .variable
        .clone()
        .or_else(|| first_listed(index.variable));

    if index.region.is_none() {
        log::debug!("Matrix has no region column; treating every row as national");
    }

    for row in rows {
        if !key_matches(&row.key, index.indicator, indicator.as_deref())
            || !key_matches(&row.key, index.variable, variable.as_deref())
        {
            continue;
        }

        let value = row.values.first().and_then(RawValue::as_f64);

        let Some(position) = index.region else {
            if value.is_some() {
                values.national = value;
            }
            continue;
        };
        match row.key.get(position) {
            Some(label) => record(&mut values, label, value),
            None => log::debug!("Skipping matrix row without a region: {:?}", row.key),
        }
    }

    values
}

// ── Year/region map ─────────────────────────────────────────────────

fn normalize_year_map(dataset: &YearRegionDataset, selection: &Selection) -> RegionValues {
    let mut values = RegionValues::default();

    let Some(regions) = dataset
        .years
        .iter()
        .find(|(year, _)| same_code(year, &selection.period))
        .map(|(_, regions)| regions)
    else {
        return values;
    };

    for (label, raw) in regions {
        record(&mut values, label, raw.as_f64());
    }

    values
}

// ── Monthly series ──────────────────────────────────────────────────

fn normalize_series(
    dataset: &MonthlySeriesDataset,
    period_field: &str,
    metric: &str,
    selection: &Selection,
) -> RegionValues {
    let national = dataset
        .entries
        .iter()
        .find(|entry| {
            entry
                .get(period_field)
                .and_then(|v| v.as_text())
                .is_some_and(|code| same_code(&code, &selection.period))
        })
        .and_then(|entry| entry.get(metric)?.as_f64());

    RegionValues {
        national,
        ..RegionValues::default()
    }
}

// ── Observations ────────────────────────────────────────────────────

fn normalize_observations(
    dataset: &ObservationsDataset,
    default_indicator: Option<&str>,
    selection: &Selection,
) -> RegionValues {
    let mut values = RegionValues::default();

    let observations: Vec<&Observation> = dataset
        .observations
        .iter()
        .filter(|obs| same_code(&obs.period, &selection.period))
        .collect();

    let indicator = selection
        .indicator
        .clone()
        .or_else(|| default_indicator.map(ToString::to_string))
        .or_else(|| observations.iter().find_map(|obs| obs.indicator.clone()));
    let variable = selection
        .variable
        .clone()
        .or_else(|| observations.iter().find_map(|obs| obs.variable.clone()));

    let optional_matches = |actual: Option<&str>, wanted: Option<&str>| match (actual, wanted) {
        (Some(actual), Some(wanted)) => same_code(actual, wanted),
        _ => true,
    };

    for obs in observations {
        if optional_matches(obs.indicator.as_deref(), indicator.as_deref())
            && optional_matches(obs.variable.as_deref(), variable.as_deref())
        {
            record(&mut values, &obs.region, obs.value.as_f64());
        }
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use statmap_indicator_models::DatasetShape;

    use crate::dataset::parse_dataset;

    fn matrix(value: serde_json::Value) -> IndicatorDataset {
        parse_dataset(
            &DatasetShape::ColumnMatrix {
                columns: ColumnCodes::default(),
                indicator: None,
            },
            value,
        )
        .unwrap()
    }

    fn inflation_matrix() -> IndicatorDataset {
        matrix(json!({
            "columns": [
                { "code": "month", "text": "Month", "type": "t" },
                { "code": "indicator", "text": "Indicator", "type": "d" },
                { "code": "region", "text": "Region", "type": "d" },
                { "code": "value", "text": "Value", "type": "c" }
            ],
            "data": [
                { "key": ["2024M03", "Inflation", "Ashanti Region"], "values": ["4.2"] },
                { "key": ["2024M03", "Inflation", "Ghana"], "values": ["5.0"] },
                { "key": ["2024M02", "Inflation", "Greater Accra"], "values": ["3.1"] },
                { "key": ["2024M03", "Food", "Ashanti Region"], "values": ["9.9"] }
            ]
        }))
    }

    #[test]
    fn matrix_routes_regions_and_national() {
        let selection = Selection {
            period: "2024M03".to_string(),
            indicator: Some("Inflation".to_string()),
            variable: None,
        };
        let values = normalize(&inflation_matrix(), &selection);

        assert_eq!(values.get("Ashanti"), Some(4.2));
        assert_eq!(values.national, Some(5.0));
        assert_eq!(values.get("Greater Accra"), None);
        assert_eq!(values.regions.len(), 1);
    }

    #[test]
    fn matrix_without_indicator_selector_uses_first_listed() {
        let values = normalize(&inflation_matrix(), &Selection::period("2024M03"));
        assert_eq!(values.get("Ashanti"), Some(4.2));
        assert_eq!(values.national, Some(5.0));
    }

    #[test]
    fn matrix_without_variable_selector_does_not_mix_variables() {
        let dataset = matrix(json!({
            "columns": [
                { "code": "month", "type": "t" },
                { "code": "indicator", "type": "d" },
                { "code": "region", "type": "d" },
                { "code": "variable", "type": "d" },
                { "code": "value", "type": "c" }
            ],
            "data": [
                { "key": ["2024M03", "Year-on-year", "Ashanti", "All items"], "values": [20] },
                { "key": ["2024M03", "Year-on-year", "Ashanti", "Food"], "values": [35] },
                { "key": ["2024M03", "Year-on-year", "Ashanti", "Non-food"], "values": [10] },
                { "key": ["2024M03", "Year-on-year", "Volta", "Non-food"], "values": [7] }
            ]
        }));

        let values = normalize(&dataset, &Selection::period("2024M03"));
        assert_eq!(values.get("Ashanti"), Some(20.0));
        assert_eq!(values.get("Volta"), None);

        let food = Selection {
            variable: Some("Food".to_string()),
            ..Selection::period("2024M03")
        };
        assert_eq!(normalize(&dataset, &food).get("Ashanti"), Some(35.0));
    }

    #[test]
    fn short_matrix_rows_do_not_touch_national() {
        let dataset = matrix(json!({
            "columns": [{ "code": "month" }, { "code": "region" }, { "code": "v", "type": "c" }],
            "data": [
                { "key": ["2024M01", "Ghana"], "values": [5.0] },
                { "key": ["2024M01"], "values": [999] }
            ]
        }));
        let values = normalize(&dataset, &Selection::period("2024M01"));
        assert_eq!(values.national, Some(5.0));
        assert!(values.regions.is_empty());
    }

    #[test]
    fn matrix_with_unknown_period_is_empty() {
        let values = normalize(&inflation_matrix(), &Selection::period("1999M01"));
        assert!(values.regions.is_empty());
        assert_eq!(values.national, None);
    }

    #[test]
    fn matrix_without_region_column_is_national() {
        let dataset = matrix(json!({
            "columns": [
                { "code": "Quarter", "type": "t" },
                { "code": "GDP", "type": "c" }
            ],
            "data": [
                { "key": ["2024Q1"], "values": ["6.1"] },
                { "key": ["2024Q2"], "values": ["5.8"] }
            ]
        }));
        let values = normalize(&dataset, &Selection::period("2024q2"));
        assert!(values.is_national_only());
        assert_eq!(values.national, Some(5.8));
    }

    #[test]
    fn matrix_filters_on_variable() {
        let dataset = matrix(json!({
            "columns": [
                { "code": "year" },
                { "code": "geo" },
                { "code": "variable" },
                { "code": "count", "type": "c" }
            ],
            "data": [
                { "key": ["2021", "Volta", "male"], "values": [10] },
                { "key": ["2021", "Volta", "female"], "values": [12] }
            ]
        }));
        let selection = Selection {
            period: "2021".to_string(),
            indicator: None,
            variable: Some("female".to_string()),
        };
        assert_eq!(normalize(&dataset, &selection).get("Volta"), Some(12.0));
    }

    #[test]
    fn missing_markers_are_omitted() {
        let dataset = matrix(json!({
            "columns": [{ "code": "month" }, { "code": "region" }, { "code": "v", "type": "c" }],
            "data": [
                { "key": ["2024M01", "Oti"], "values": [".."] },
                { "key": ["2024M01", "Volta"], "values": [""] },
                { "key": ["2024M01", "Bono"], "values": ["-"] },
                { "key": ["2024M01", "Western"], "values": [null] },
                { "key": ["2024M01", "Central"], "values": [] },
                { "key": ["2024M01", "Northern"], "values": [2.5] }
            ]
        }));
        let values = normalize(&dataset, &Selection::period("2024M01"));
        assert_eq!(values.regions.keys().collect::<Vec<_>>(), vec!["Northern"]);
        assert_eq!(values.get("Northern"), Some(2.5));
    }

    #[test]
    fn empty_matrix_is_national_only_without_value() {
        let dataset = matrix(json!({ "columns": [], "data": [] }));
        let values = normalize(&dataset, &Selection::period("2024M03"));
        assert!(values.is_national_only());
        assert_eq!(values.national, None);
    }

    #[test]
    fn year_map_reads_one_year() {
        let dataset = IndicatorDataset::YearRegionMap(
            serde_json::from_value(json!({
                "2010": { "Ashanti": 4_780_380, "National": 24_658_823 },
                "2021": { "Ashanti Region": "5440463", "National": 30_832_019, "Oti": null }
            }))
            .unwrap(),
        );
        let values = normalize(&dataset, &Selection::period("2021"));
        assert_eq!(values.get("Ashanti"), Some(5_440_463.0));
        assert_eq!(values.national, Some(30_832_019.0));
        assert_eq!(values.get("Oti"), None);
    }

    #[test]
    fn monthly_series_is_always_national() {
        let dataset = IndicatorDataset::MonthlySeries {
            period_field: "month".to_string(),
            metric: "rate".to_string(),
            series: serde_json::from_value(json!([
                { "month": "2024M01", "rate": 23.5 },
                { "month": "2024M02", "rate": "23.2" }
            ]))
            .unwrap(),
        };
        let values = normalize(&dataset, &Selection::period("2024M02"));
        assert!(values.is_national_only());
        assert_eq!(values.national, Some(23.2));
        assert_eq!(normalize(&dataset, &Selection::period("2024M09")).national, None);
    }

    #[test]
    fn observations_filter_on_indicator() {
        let dataset = IndicatorDataset::Observations {
            default_indicator: Some("unemployment".to_string()),
            observations: serde_json::from_value(json!([
                { "period": "2024Q1", "region": "Ashanti", "indicator": "unemployment", "value": 13.1 },
                { "period": "2024Q1", "region": "Ashanti", "indicator": "employment", "value": 60.0 },
                { "period": "2024Q1", "region": "National", "indicator": "unemployment", "value": 14.5 }
            ]))
            .unwrap(),
        };
        let values = normalize(&dataset, &Selection::period("2024Q1"));
        assert_eq!(values.get("Ashanti"), Some(13.1));
        assert_eq!(values.national, Some(14.5));
    }

    #[test]
    fn observations_without_selector_keep_one_indicator() {
        let dataset = IndicatorDataset::Observations {
            default_indicator: None,
            observations: serde_json::from_value(json!([
                { "period": "2024Q1", "region": "Volta", "indicator": "poverty", "value": 30.0 },
                { "period": "2024Q1", "region": "Volta", "indicator": "extreme_poverty", "value": 8.0 }
            ]))
            .unwrap(),
        };
        let values = normalize(&dataset, &Selection::period("2024Q1"));
        assert_eq!(values.get("Volta"), Some(30.0));
    }

    #[test]
    fn non_finite_national_is_none() {
        let dataset = IndicatorDataset::Observations {
            default_indicator: None,
            observations: ObservationsDataset {
                observations: vec![statmap_indicator_models::Observation {
                    period: "2024M01".to_string(),
                    region: "Ghana".to_string(),
                    indicator: None,
                    variable: None,
                    value: RawValue::Number(f64::NAN),
                }],
            },
        };
        assert_eq!(normalize(&dataset, &Selection::period("2024M01")).national, None);
    }

    #[test]
    fn national_labels() {
        assert!(is_national_label("Ghana"));
        assert!(is_national_label("  GHANA (total) "));
        assert!(is_national_label("National"));
        assert!(!is_national_label("Nationalities"));
        assert!(!is_national_label("Ashanti"));
    }

    #[test]
    fn periods_are_distinct_in_first_seen_order() {
        assert_eq!(
            available_periods(&inflation_matrix()),
            vec!["2024M03".to_string(), "2024M02".to_string()]
        );
    }
}
