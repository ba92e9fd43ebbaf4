//! Validation and normalization of raw `GeoJSON` features.
//!
//! Each feature is checked on its own so that one bad geometry never
//! takes down the whole collection. Features whose geometry is missing,
//! of a non-areal type, or structurally broken are dropped and counted.

use geo::MultiPolygon;
use serde_json::Value;
use statmap_geography_models::Granularity;

use crate::{FeatureCollection, GeoError, GeoFeature};

/// Property keys tried, in order, when looking for a feature's name.
const NAME_KEYS: &[&str] = &[
    "name", "NAME", "Name", "region", "REGION", "Region", "district", "DISTRICT", "District",
    "NAME_1", "NAME_2", "ADM1_EN", "ADM2_EN",
];

/// Name used when no known property key holds a usable string.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Returns `true` if the raw geometry is a `Polygon` or `MultiPolygon`
/// object with a non-empty coordinate array.
#[must_use]
pub fn is_valid_geometry(geometry: Option<&Value>) -> bool {
    let Some(geometry) = geometry else {
        return false;
    };

    let kind = geometry.get("type").and_then(Value::as_str);
    matches!(kind, Some("Polygon" | "MultiPolygon"))
        && geometry
            .get("coordinates")
            .and_then(Value::as_array)
            .is_some_and(|coordinates| !coordinates.is_empty())
}

/// Resolves a display name from a feature's `properties` object.
#[must_use]
pub fn feature_name(properties: Option<&Value>) -> String {
    properties
        .and_then(|props| {
            NAME_KEYS.iter().find_map(|key| {
                props
                    .get(key)
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
            })
        })
        .unwrap_or(UNKNOWN_NAME)
        .to_string()
}

/// Converts a raw areal geometry into a [`MultiPolygon`].
///
/// Polygons with an empty exterior ring are dropped. Returns `None` for
/// anything that is not a well-formed polygon or multipolygon, or that
/// has no polygon left to draw.
#[must_use]
pub fn to_multipolygon(geometry: &Value) -> Option<MultiPolygon<f64>> {
    let geometry = geojson::Geometry::from_json_value(geometry.clone()).ok()?;
    let geometry: geo::Geometry<f64> = geometry.value.try_into().ok()?;

    let polygons = match geometry {
        geo::Geometry::Polygon(polygon) => vec![polygon],
        geo::Geometry::MultiPolygon(multi) => multi.0,
        _ => return None,
    };
    let polygons: Vec<_> = polygons
        .into_iter()
        .filter(|polygon| !polygon.exterior().0.is_empty())
        .collect();

    (!polygons.is_empty()).then(|| MultiPolygon::new(polygons))
}

/// Parses a `FeatureCollection` document, keeping only drawable features.
///
/// # Errors
///
/// Returns [`GeoError::InvalidCollection`] if the document has no
/// `features` array. Individual bad features are never an error.
pub fn parse_feature_collection(
    granularity: Granularity,
    document: &Value,
) -> Result<FeatureCollection, GeoError> {
    let raw_features =
        document
            .get("features")
            .and_then(Value::as_array)
            .ok_or_else(|| GeoError::InvalidCollection {
                message: "No features array in document".to_string(),
            })?;

    let features: Vec<GeoFeature> = raw_features.iter().filter_map(normalize_feature).collect();
    let excluded = raw_features.len() - features.len();

    if excluded > 0 {
        log::warn!(
            "{granularity}: excluded {excluded} of {} features with unusable geometry",
            raw_features.len()
        );
    }
    log::info!("{granularity}: loaded {} features", features.len());

    Ok(FeatureCollection {
        granularity,
        features,
        excluded,
    })
}

/// Normalizes a single raw feature.
fn normalize_feature(feature: &Value) -> Option<GeoFeature> {
    let name = feature_name(feature.get("properties"));
    let geometry = feature.get("geometry");

    if !is_valid_geometry(geometry) {
        log::debug!("Skipping feature {name}: missing or non-areal geometry");
        return None;
    }

    let Some(geometry) = geometry.and_then(to_multipolygon) else {
        log::debug!("Skipping feature {name}: malformed coordinates");
        return None;
    };

    Some(GeoFeature::new(name, geometry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn square(name: &str) -> Value {
        json!({
            "type": "Feature",
            "properties": { "name": name },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
            }
        })
    }

    #[test]
    fn null_and_point_geometries_are_invalid() {
        assert!(!is_valid_geometry(None));
        assert!(!is_valid_geometry(Some(&Value::Null)));
        assert!(!is_valid_geometry(Some(
            &json!({ "type": "Point", "coordinates": [0, 0] })
        )));
    }

    #[test]
    fn polygon_geometries_are_valid() {
        assert!(is_valid_geometry(Some(&json!({
            "type": "Polygon",
            "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]
        }))));
        assert!(is_valid_geometry(Some(&json!({
            "type": "MultiPolygon",
            "coordinates": [[[[0, 0], [1, 0], [1, 1], [0, 0]]]]
        }))));
    }

    #[test]
    fn polygon_without_coordinates_is_invalid() {
        assert!(!is_valid_geometry(Some(&json!({ "type": "Polygon" }))));
        assert!(!is_valid_geometry(Some(
            &json!({ "type": "Polygon", "coordinates": null })
        )));
    }

    #[test]
    fn polygon_with_empty_coordinates_is_invalid() {
        assert!(!is_valid_geometry(Some(
            &json!({ "type": "Polygon", "coordinates": [] })
        )));
        assert!(!is_valid_geometry(Some(
            &json!({ "type": "MultiPolygon", "coordinates": [] })
        )));
    }

    #[test]
    fn empty_geometries_are_counted_as_excluded() {
        let document = json!({
            "features": [
                square("Volta"),
                {
                    "properties": { "name": "Empty" },
                    "geometry": { "type": "Polygon", "coordinates": [] }
                },
                {
                    "properties": { "name": "Hollow" },
                    "geometry": { "type": "MultiPolygon", "coordinates": [] }
                },
                {
                    "properties": { "name": "Ringless" },
                    "geometry": { "type": "Polygon", "coordinates": [[]] }
                }
            ]
        });

        let collection = parse_feature_collection(Granularity::Regions, &document).unwrap();
        assert_eq!(collection.excluded, 3);
        assert_eq!(collection.features.len(), 1);
        assert_eq!(collection.features[0].name, "Volta");
    }

    #[test]
    fn name_lookup_tries_aliases() {
        assert_eq!(feature_name(Some(&json!({ "REGION": "Volta" }))), "Volta");
        assert_eq!(feature_name(Some(&json!({ "ADM2_EN": " Ho " }))), "Ho");
        assert_eq!(
            feature_name(Some(&json!({ "name": "", "NAME_1": "Oti" }))),
            "Oti"
        );
    }

    #[test]
    fn name_lookup_falls_back_to_unknown() {
        assert_eq!(feature_name(None), UNKNOWN_NAME);
        assert_eq!(feature_name(Some(&json!({ "code": 7 }))), UNKNOWN_NAME);
    }

    #[test]
    fn collection_drops_unusable_features() {
        let document = json!({
            "type": "FeatureCollection",
            "features": [
                square("Ashanti Region"),
                { "type": "Feature", "properties": { "name": "Ghost" }, "geometry": null },
                {
                    "type": "Feature",
                    "properties": { "name": "Pin" },
                    "geometry": { "type": "Point", "coordinates": [0.0, 0.0] }
                },
                {
                    "type": "Feature",
                    "properties": { "name": "Broken" },
                    "geometry": { "type": "Polygon", "coordinates": [[["a", "b"]]] }
                },
                square("Greater Accra")
            ]
        });

        let collection = parse_feature_collection(Granularity::Regions, &document).unwrap();

        assert_eq!(collection.excluded, 3);
        let names: Vec<&str> = collection.features.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Ashanti Region", "Greater Accra"]);
        assert_eq!(collection.features[0].key, "Ashanti");
    }

    #[test]
    fn multipolygon_features_are_kept_whole() {
        let document = json!({
            "features": [{
                "properties": { "name": "Islands" },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
                        [[[2.0, 2.0], [3.0, 2.0], [3.0, 3.0], [2.0, 2.0]]]
                    ]
                }
            }]
        });

        let collection = parse_feature_collection(Granularity::Districts, &document).unwrap();
        assert_eq!(collection.features.len(), 1);
        assert_eq!(collection.features[0].geometry.0.len(), 2);
    }

    #[test]
    fn missing_features_array_is_an_error() {
        let result = parse_feature_collection(Granularity::Regions, &json!({ "type": "Feature" }));
        assert!(matches!(result, Err(GeoError::InvalidCollection { .. })));
    }
}
