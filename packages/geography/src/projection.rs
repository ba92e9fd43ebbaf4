//! Planar projection of longitude/latitude into a drawing viewport.
//!
//! The projection is a plain equirectangular fit: one scale factor for
//! both axes (so shapes are never stretched), the projected extent
//! centred in the viewport, and latitude flipped so north is up.

use geo::BoundingRect as _;
use statmap_geography_models::{Bounds, ProjectedPoint, Viewport};

use crate::GeoFeature;

/// Maps geographic coordinates onto a [`Viewport`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projector {
    bounds: Bounds,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

impl Projector {
    /// Fits `bounds` into `viewport`, preserving aspect ratio.
    ///
    /// Zero-width or zero-height bounds use a span of 1 so the result is
    /// always finite. A viewport smaller than twice its padding collapses
    /// to a zero scale rather than mirroring the map.
    #[must_use]
    pub fn new(bounds: Bounds, viewport: Viewport) -> Self {
        let lon_span = bounds.lon_span();
        let lat_span = bounds.lat_span();

        let usable_width = 2.0f64.mul_add(-viewport.padding, viewport.width).max(0.0);
        let usable_height = 2.0f64.mul_add(-viewport.padding, viewport.height).max(0.0);

        let scale = (usable_width / lon_span).min(usable_height / lat_span);

        let offset_x = viewport.padding + lon_span.mul_add(-scale, usable_width) / 2.0;
        let offset_y = viewport.padding + lat_span.mul_add(-scale, usable_height) / 2.0;

        Self {
            bounds,
            scale,
            offset_x,
            offset_y,
        }
    }

    /// Projects a single coordinate.
    #[must_use]
    pub fn project(&self, lon: f64, lat: f64) -> ProjectedPoint {
        ProjectedPoint {
            x: (lon - self.bounds.min_lon).mul_add(self.scale, self.offset_x),
            y: (self.bounds.max_lat - lat).mul_add(self.scale, self.offset_y),
        }
    }

    /// Drawing units per degree.
    #[must_use]
    pub const fn scale(&self) -> f64 {
        self.scale
    }

    /// The geographic extent this projector was fitted to.
    #[must_use]
    pub const fn bounds(&self) -> Bounds {
        self.bounds
    }
}

/// Computes the combined extent of a feature set.
///
/// Returns [`Bounds::UNIT`] when there is nothing to measure.
#[must_use]
pub fn compute_bounds(features: &[GeoFeature]) -> Bounds {
    features
        .iter()
        .filter_map(|feature| feature.geometry.bounding_rect())
        .map(|rect| Bounds {
            min_lon: rect.min().x,
            max_lon: rect.max().x,
            min_lat: rect.min().y,
            max_lat: rect.max().y,
        })
        .filter(|b| {
            b.min_lon.is_finite()
                && b.max_lon.is_finite()
                && b.min_lat.is_finite()
                && b.max_lat.is_finite()
        })
        .reduce(Bounds::union)
        .unwrap_or(Bounds::UNIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{MultiPolygon, polygon};

    const EPS: f64 = 1e-9;

    fn ghana_bounds() -> Bounds {
        Bounds {
            min_lon: -3.26,
            max_lon: 1.2,
            min_lat: 4.74,
            max_lat: 11.17,
        }
    }

    fn assert_inside(point: ProjectedPoint, viewport: Viewport) {
        assert!(point.x >= viewport.padding - EPS, "x too small: {point:?}");
        assert!(point.x <= viewport.width - viewport.padding + EPS, "x too large: {point:?}");
        assert!(point.y >= viewport.padding - EPS, "y too small: {point:?}");
        assert!(point.y <= viewport.height - viewport.padding + EPS, "y too large: {point:?}");
    }

    #[test]
    fn corners_land_inside_padded_viewport() {
        for viewport in [
            Viewport::default(),
            Viewport {
                width: 1200.0,
                height: 300.0,
                padding: 10.0,
            },
            Viewport {
                width: 250.0,
                height: 900.0,
                padding: 0.0,
            },
        ] {
            let bounds = ghana_bounds();
            let projector = Projector::new(bounds, viewport);
            for (lon, lat) in [
                (bounds.min_lon, bounds.min_lat),
                (bounds.min_lon, bounds.max_lat),
                (bounds.max_lon, bounds.min_lat),
                (bounds.max_lon, bounds.max_lat),
            ] {
                assert_inside(projector.project(lon, lat), viewport);
            }
        }
    }

    #[test]
    fn north_is_up() {
        let projector = Projector::new(ghana_bounds(), Viewport::default());
        let north = projector.project(0.0, 11.0);
        let south = projector.project(0.0, 5.0);
        assert!(north.y < south.y);
    }

    #[test]
    fn extent_is_centred_on_the_slack_axis() {
        let viewport = Viewport {
            width: 400.0,
            height: 200.0,
            padding: 0.0,
        };
        let bounds = Bounds {
            min_lon: 0.0,
            max_lon: 1.0,
            min_lat: 0.0,
            max_lat: 1.0,
        };
        let projector = Projector::new(bounds, viewport);
        assert!((projector.scale() - 200.0).abs() < EPS);
        let left = projector.project(0.0, 0.0);
        let right = projector.project(1.0, 1.0);
        assert!((left.x - 100.0).abs() < EPS);
        assert!((right.x - 300.0).abs() < EPS);
        assert!((right.y - 0.0).abs() < EPS);
        assert!((left.y - 200.0).abs() < EPS);
    }

    #[test]
    fn degenerate_bounds_stay_finite() {
        let bounds = Bounds {
            min_lon: 1.0,
            max_lon: 1.0,
            min_lat: 7.0,
            max_lat: 7.0,
        };
        let projector = Projector::new(bounds, Viewport::default());
        let point = projector.project(1.0, 7.0);
        assert!(point.x.is_finite());
        assert!(point.y.is_finite());
        assert!(projector.scale().is_finite());
    }

    #[test]
    fn tiny_viewport_does_not_mirror() {
        let viewport = Viewport {
            width: 10.0,
            height: 10.0,
            padding: 20.0,
        };
        let projector = Projector::new(ghana_bounds(), viewport);
        assert!(projector.scale().abs() < EPS);
        let point = projector.project(0.0, 8.0);
        assert!(point.x.is_finite() && point.y.is_finite());
    }

    #[test]
    fn bounds_cover_all_features() {
        let a = GeoFeature::new(
            "A",
            MultiPolygon::new(vec![polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 2.0)]]),
        );
        let b = GeoFeature::new(
            "B",
            MultiPolygon::new(vec![polygon![(x: -3.0, y: 1.0), (x: -2.0, y: 1.0), (x: -2.0, y: 5.0)]]),
        );
        let bounds = compute_bounds(&[a, b]);
        assert_eq!(
            bounds,
            Bounds {
                min_lon: -3.0,
                max_lon: 1.0,
                min_lat: 0.0,
                max_lat: 5.0,
            }
        );
    }

    #[test]
    fn empty_feature_set_uses_unit_bounds() {
        assert_eq!(compute_bounds(&[]), Bounds::UNIT);
    }
}
