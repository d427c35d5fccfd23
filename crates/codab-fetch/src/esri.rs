// SPDX-License-Identifier: Apache-2.0

use codab_model::{AttrValue, BoundaryFeature, BoundaryLayer};
use geo_types::{Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint,
    MultiPolygon, Point, Polygon};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::{FetchError, FetchErrorCode};

/// Error object embedded in an otherwise-200 service response.
#[must_use]
pub fn payload_error(payload: &Value) -> Option<String> {
    let error = payload.get("error")?;
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unspecified service error");
    Some(message.to_string())
}

/// True when the server truncated the result set.
#[must_use]
pub fn payload_exceeded_limit(payload: &Value) -> bool {
    payload
        .get("exceededTransferLimit")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Decode accumulated query pages into a boundary layer.
///
/// Column order comes from the first page's `fields` declaration with
/// `geometry` appended; feature order is page order, which the fixed
/// `orderByFields` makes deterministic.
pub fn decode_layer(pages: &[Value]) -> Result<BoundaryLayer, FetchError> {
    let first = pages
        .first()
        .ok_or_else(|| FetchError::new(FetchErrorCode::Decode, "no pages to decode"))?;

    let mut columns: Vec<String> = first
        .get("fields")
        .and_then(Value::as_array)
        .map(|fields| {
            fields
                .iter()
                .filter_map(|f| f.get("name").and_then(Value::as_str))
                .map(|name| name.to_ascii_lowercase())
                .collect()
        })
        .unwrap_or_default();
    if !columns.iter().any(|c| c == "geometry") {
        columns.push("geometry".to_string());
    }

    let mut features = Vec::new();
    for page in pages {
        let page_features = page
            .get("features")
            .and_then(Value::as_array)
            .ok_or_else(|| FetchError::new(FetchErrorCode::Decode, "payload has no features"))?;
        for raw in page_features {
            features.push(decode_feature(raw));
        }
    }

    // A layer served without field metadata still gets a usable
    // column list from the observed attributes.
    if columns.len() == 1 {
        let mut seen: Vec<String> = Vec::new();
        for feature in &features {
            for name in feature.attributes.keys() {
                if !seen.iter().any(|s| s == name) {
                    seen.push(name.clone());
                }
            }
        }
        seen.push("geometry".to_string());
        columns = seen;
    }

    Ok(BoundaryLayer::new(columns, features))
}

fn decode_feature(raw: &Value) -> BoundaryFeature {
    let mut attributes = BTreeMap::new();
    if let Some(attrs) = raw.get("attributes").and_then(Value::as_object) {
        for (name, value) in attrs {
            attributes.insert(name.to_ascii_lowercase(), decode_attr(value));
        }
    }
    let geometry = raw.get("geometry").map_or_else(empty_geometry, decode_geometry);
    BoundaryFeature {
        geometry,
        attributes,
    }
}

fn decode_attr(value: &Value) -> AttrValue {
    match value {
        Value::Null => AttrValue::Null,
        Value::String(s) => AttrValue::Text(s.clone()),
        Value::Number(n) => n.as_f64().map_or(AttrValue::Null, AttrValue::Number),
        Value::Bool(b) => AttrValue::Text(b.to_string()),
        other => AttrValue::Text(other.to_string()),
    }
}

/// Stand-in for absent geometry; detected later as "no geometry kind",
/// a known transient failure mode of the server.
fn empty_geometry() -> Geometry<f64> {
    Geometry::GeometryCollection(GeometryCollection(vec![]))
}

fn decode_geometry(geometry: &Value) -> Geometry<f64> {
    if let (Some(x), Some(y)) = (
        geometry.get("x").and_then(Value::as_f64),
        geometry.get("y").and_then(Value::as_f64),
    ) {
        return Geometry::Point(Point::new(x, y));
    }
    if let Some(points) = geometry.get("points").and_then(Value::as_array) {
        let coords: Vec<Point<f64>> = points
            .iter()
            .filter_map(decode_coord)
            .map(Point::from)
            .collect();
        return Geometry::MultiPoint(MultiPoint(coords));
    }
    if let Some(paths) = geometry.get("paths").and_then(Value::as_array) {
        let lines: Vec<LineString<f64>> = paths.iter().filter_map(decode_ring).collect();
        return Geometry::MultiLineString(MultiLineString(lines));
    }
    if let Some(rings) = geometry.get("rings").and_then(Value::as_array) {
        let rings: Vec<LineString<f64>> = rings.iter().filter_map(decode_ring).collect();
        return Geometry::MultiPolygon(assemble_polygons(rings));
    }
    empty_geometry()
}

fn decode_coord(value: &Value) -> Option<Coord<f64>> {
    let pair = value.as_array()?;
    Some(Coord {
        x: pair.first()?.as_f64()?,
        y: pair.get(1)?.as_f64()?,
    })
}

fn decode_ring(value: &Value) -> Option<LineString<f64>> {
    let coords: Vec<Coord<f64>> = value.as_array()?.iter().filter_map(decode_coord).collect();
    if coords.len() < 2 {
        return None;
    }
    Some(LineString::from(coords))
}

/// ESRI rings are a flat list: exterior rings wind clockwise, holes
/// counter-clockwise. Holes attach to the nearest preceding exterior
/// whose bounding box contains their first vertex.
fn assemble_polygons(rings: Vec<LineString<f64>>) -> MultiPolygon<f64> {
    let mut polygons: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();
    for ring in rings {
        if shoelace_area(&ring) <= 0.0 {
            // Clockwise: exterior.
            polygons.push((ring, Vec::new()));
        } else if let Some(owner) = polygons
            .iter_mut()
            .rev()
            .find(|(exterior, _)| bbox_contains(exterior, &ring))
        {
            owner.1.push(ring);
        } else if let Some(last) = polygons.last_mut() {
            last.1.push(ring);
        } else {
            // A hole with no exterior at all; keep the data rather
            // than dropping it.
            polygons.push((ring, Vec::new()));
        }
    }
    MultiPolygon(
        polygons
            .into_iter()
            .map(|(exterior, holes)| Polygon::new(exterior, holes))
            .collect(),
    )
}

fn shoelace_area(ring: &LineString<f64>) -> f64 {
    let coords = &ring.0;
    let mut sum = 0.0;
    for window in coords.windows(2) {
        sum += window[0].x * window[1].y - window[1].x * window[0].y;
    }
    sum / 2.0
}

fn bbox_contains(exterior: &LineString<f64>, hole: &LineString<f64>) -> bool {
    let Some(first) = hole.0.first() else {
        return false;
    };
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for c in &exterior.0 {
        min_x = min_x.min(c.x);
        min_y = min_y.min(c.y);
        max_x = max_x.max(c.x);
        max_y = max_y.max(c.y);
    }
    first.x >= min_x && first.x <= max_x && first.y >= min_y && first.y <= max_y
}

#[cfg(test)]
mod tests {
    use super::*;
    use codab_model::GeometryKind;
    use serde_json::json;

    #[test]
    fn decodes_polygon_features_with_fields() {
        let page = json!({
            "fields": [
                {"name": "ADM0_PCODE"},
                {"name": "ADM0_NAME"}
            ],
            "features": [{
                "attributes": {"ADM0_PCODE": "CAF", "ADM0_NAME": "Central African Republic"},
                "geometry": {"rings": [[[0.0, 0.0], [0.0, 2.0], [2.0, 2.0], [2.0, 0.0], [0.0, 0.0]]]}
            }]
        });
        let layer = decode_layer(&[page]).expect("decode");
        assert_eq!(layer.columns, vec!["adm0_pcode", "adm0_name", "geometry"]);
        assert_eq!(layer.features.len(), 1);
        let feature = &layer.features[0];
        assert_eq!(
            feature.attr("adm0_pcode").as_text(),
            Some("CAF")
        );
        assert_eq!(layer.geometry_kind(), Some(GeometryKind::Polygon));
    }

    #[test]
    fn missing_geometry_yields_no_kind() {
        let page = json!({
            "features": [{"attributes": {"adm0_pcode": "CAF"}}]
        });
        let layer = decode_layer(&[page]).expect("decode");
        assert_eq!(layer.geometry_kind(), None);
    }

    #[test]
    fn detects_embedded_service_errors_and_truncation() {
        let error = json!({"error": {"code": 500, "message": "out of memory"}});
        assert_eq!(payload_error(&error), Some("out of memory".to_string()));
        assert_eq!(payload_error(&json!({"features": []})), None);

        assert!(payload_exceeded_limit(&json!({"exceededTransferLimit": true})));
        assert!(!payload_exceeded_limit(&json!({})));
    }

    #[test]
    fn hole_rings_attach_to_their_exterior() {
        // Exterior clockwise, hole counter-clockwise.
        let page = json!({
            "features": [{
                "attributes": {},
                "geometry": {"rings": [
                    [[0.0, 0.0], [0.0, 4.0], [4.0, 4.0], [4.0, 0.0], [0.0, 0.0]],
                    [[1.0, 1.0], [2.0, 1.0], [2.0, 2.0], [1.0, 2.0], [1.0, 1.0]]
                ]}
            }]
        });
        let layer = decode_layer(&[page]).expect("decode");
        match &layer.features[0].geometry {
            Geometry::MultiPolygon(mp) => {
                assert_eq!(mp.0.len(), 1);
                assert_eq!(mp.0[0].interiors().len(), 1);
            }
            other => panic!("expected multipolygon, got {other:?}"),
        }
    }
}
