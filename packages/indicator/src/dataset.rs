//! Dataset file loading.

use std::path::Path;

use statmap_indicator_models::{DatasetShape, IndicatorDataset, IndicatorDefinition};

use crate::IndicatorError;

/// Interprets a JSON document according to `shape`.
///
/// # Errors
///
/// Returns [`IndicatorError::Json`] if the document does not have the
/// layout `shape` declares.
pub fn parse_dataset(
    shape: &DatasetShape,
    document: serde_json::Value,
) -> Result<IndicatorDataset, IndicatorError> {
    Ok(match shape {
        DatasetShape::ColumnMatrix { columns, indicator } => IndicatorDataset::ColumnMatrix {
            codes: columns.clone(),
            default_indicator: indicator.clone(),
            matrix: serde_json::from_value(document)?,
        },
        DatasetShape::YearRegionMap => {
            IndicatorDataset::YearRegionMap(serde_json::from_value(document)?)
        }
        DatasetShape::MonthlySeries {
            period_field,
            metric,
        } => IndicatorDataset::MonthlySeries {
            period_field: period_field.clone(),
            metric: metric.clone(),
            series: serde_json::from_value(document)?,
        },
        DatasetShape::Observations { indicator } => IndicatorDataset::Observations {
            default_indicator: indicator.clone(),
            observations: serde_json::from_value(document)?,
        },
    })
}

/// Reads an indicator's dataset file from `data_dir`.
///
/// # Errors
///
/// Returns [`IndicatorError`] if the file cannot be read or parsed.
pub async fn load_dataset(
    data_dir: &Path,
    definition: &IndicatorDefinition,
) -> Result<IndicatorDataset, IndicatorError> {
    let path = data_dir.join(&definition.file);
    log::info!("Loading indicator '{}' from {}", definition.id, path.display());

    let body = tokio::fs::read_to_string(&path).await?;
    let document: serde_json::Value = serde_json::from_str(&body)?;
    let dataset = parse_dataset(&definition.shape, document)?;

    log::debug!("Loaded indicator '{}'", definition.id);
    Ok(dataset)
}
