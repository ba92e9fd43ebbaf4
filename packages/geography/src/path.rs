//! SVG path data for projected boundaries.
//!
//! Every ring becomes one closed subpath (`M … L … Z`). Interior rings
//! are emitted exactly like exterior rings; there is no winding-based
//! hole handling, so a donut-shaped region renders with its hole filled.

use std::fmt::Write as _;

use geo::{LineString, MultiPolygon};

use crate::projection::Projector;

/// Builds the `d` attribute for a (multi)polygon.
///
/// Coordinates are rounded to two decimals. Empty rings are skipped; a
/// geometry with no points yields an empty string.
#[must_use]
pub fn build_path_d(geometry: &MultiPolygon<f64>, projector: &Projector) -> String {
    let mut subpaths = Vec::new();

    for polygon in &geometry.0 {
        let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
        subpaths.extend(rings.filter_map(|ring| ring_path(ring, projector)));
    }

    subpaths.join(" ")
}

/// Serializes one ring as a closed subpath.
fn ring_path(ring: &LineString<f64>, projector: &Projector) -> Option<String> {
    let mut d = String::new();

    for (i, coord) in ring.coords().enumerate() {
        let point = projector.project(coord.x, coord.y);
        let command = if i == 0 { "M" } else { " L" };
        let _ = write!(d, "{command}{:.2},{:.2}", point.x, point.y);
    }

    if d.is_empty() {
        return None;
    }

    d.push_str(" Z");
    Some(d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Polygon, polygon};
    use statmap_geography_models::{Bounds, Viewport};

    fn unit_projector() -> Projector {
        Projector::new(
            Bounds::UNIT,
            Viewport {
                width: 100.0,
                height: 100.0,
                padding: 0.0,
            },
        )
    }

    fn unit_square() -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0)
        ]])
    }

    #[test]
    fn single_ring_is_one_closed_subpath() {
        let d = build_path_d(&unit_square(), &unit_projector());
        assert_eq!(d.matches('M').count(), 1);
        assert!(d.ends_with(" Z"), "unexpected path: {d}");
        assert!(d.starts_with("M0.00,100.00 L100.00,100.00"));
    }

    #[test]
    fn open_ring_is_still_closed() {
        let open = MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]),
            vec![],
        )]);
        let d = build_path_d(&open, &unit_projector());
        assert!(d.ends_with(" Z"));
        assert_eq!(d.matches('Z').count(), 1);
    }

    #[test]
    fn holes_are_emitted_as_plain_subpaths() {
        let donut = MultiPolygon::new(vec![polygon!(
            exterior: [
                (x: 0.0, y: 0.0),
                (x: 1.0, y: 0.0),
                (x: 1.0, y: 1.0),
                (x: 0.0, y: 1.0)
            ],
            interiors: [[
                (x: 0.25, y: 0.25),
                (x: 0.75, y: 0.25),
                (x: 0.75, y: 0.75)
            ]]
        )]);
        let d = build_path_d(&donut, &unit_projector());
        assert_eq!(d.matches('M').count(), 2);
        assert_eq!(d.matches(" Z").count(), 2);
    }

    #[test]
    fn multipolygon_parts_are_concatenated() {
        let mut parts = unit_square();
        parts.0.push(polygon![(x: 0.0, y: 0.0), (x: 0.5, y: 0.0), (x: 0.5, y: 0.5)]);
        let d = build_path_d(&parts, &unit_projector());
        assert_eq!(d.matches('M').count(), 2);
        assert!(d.contains("Z M"));
    }

    #[test]
    fn empty_geometry_yields_empty_path() {
        let empty = MultiPolygon::<f64>::new(vec![]);
        assert_eq!(build_path_d(&empty, &unit_projector()), "");

        let hollow = MultiPolygon::new(vec![Polygon::new(LineString::new(vec![]), vec![])]);
        assert_eq!(build_path_d(&hollow, &unit_projector()), "");
    }

    #[test]
    fn every_command_is_well_formed() {
        let d = build_path_d(&unit_square(), &unit_projector());
        for token in d.split(' ') {
            let ok = token == "Z"
                || ((token.starts_with('M') || token.starts_with('L'))
                    && token[1..]
                        .split(',')
                        .all(|n| n.parse::<f64>().is_ok_and(f64::is_finite)));
            assert!(ok, "bad token {token:?} in {d}");
        }
    }
}
