//! Standalone SVG output for a [`ChoroplethLayer`].

use std::fmt::Write as _;

use crate::layer::ChoroplethLayer;

/// Escapes text for use in XML content and attribute values.
fn xml_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| "no data".to_string(), |v| v.to_string())
}

/// Serializes a layer as an SVG document.
///
/// Each region becomes one `<path>` with a `<title>` holding its name and
/// value. The banner, when present, is drawn as a text line at the top.
#[must_use]
pub fn to_svg(layer: &ChoroplethLayer) -> String {
    let mut out = String::new();

    let _ = writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = layer.width,
        h = layer.height,
    );

    let _ = writeln!(
        out,
        r##"  <g class="{}" stroke="#ffffff" stroke-width="0.5">"##,
        layer.granularity
    );
    for shape in &layer.shapes {
        if shape.path.is_empty() {
            continue;
        }
        let _ = writeln!(
            out,
            r#"    <path d="{}" fill="{}" data-key="{}"><title>{}: {}</title></path>"#,
            shape.path,
            xml_escape(&shape.fill),
            xml_escape(&shape.key),
            xml_escape(&shape.name),
            format_value(shape.value),
        );
    }
    let _ = writeln!(out, "  </g>");

    if let Some(message) = layer.banner.message() {
        let _ = writeln!(
            out,
            r#"  <text class="banner {}" x="{}" y="16" text-anchor="middle">{}</text>"#,
            layer.banner.as_ref(),
            layer.width / 2.0,
            xml_escape(message),
        );
    }

    let _ = writeln!(out, "</svg>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use statmap_geography_models::Granularity;

    use crate::layer::{Banner, RegionShape};

    fn layer(shapes: Vec<RegionShape>, banner: Banner) -> ChoroplethLayer {
        ChoroplethLayer {
            granularity: Granularity::Districts,
            width: 200.0,
            height: 100.0,
            shapes,
            national: None,
            range: None,
            legend: vec![],
            banner,
            excluded: 0,
        }
    }

    fn shape(name: &str, path: &str, value: Option<f64>) -> RegionShape {
        RegionShape {
            name: name.to_string(),
            key: name.to_string(),
            path: path.to_string(),
            value,
            fill: "#08519c".to_string(),
        }
    }

    #[test]
    fn escape_handles_special_characters() {
        assert_eq!(xml_escape("&<>\"'"), "&amp;&lt;&gt;&quot;&apos;");
        assert_eq!(xml_escape("Ho West"), "Ho West");
    }

    #[test]
    fn one_path_per_drawable_region() {
        let svg = to_svg(&layer(
            vec![
                shape("Ho", "M0.00,0.00 L1.00,1.00 Z", Some(3.5)),
                shape("Keta & Anloga", "M2.00,2.00 L3.00,3.00 Z", None),
                shape("Empty", "", Some(1.0)),
            ],
            Banner::None,
        ));

        assert!(svg.starts_with("<?xml"));
        assert!(svg.contains(r#"viewBox="0 0 200 100""#));
        assert_eq!(svg.matches("<path ").count(), 2);
        assert!(svg.contains("<title>Ho: 3.5</title>"));
        assert!(svg.contains("<title>Keta &amp; Anloga: no data</title>"));
        assert!(svg.contains(r#"<g class="districts""#));
        assert!(!svg.contains("banner"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn national_only_banner_is_drawn() {
        let svg = to_svg(&layer(vec![], Banner::NationalOnly));
        assert!(svg.contains(r#"class="banner national-only""#));
        assert!(svg.contains("Regional breakdown not available"));
    }
}
