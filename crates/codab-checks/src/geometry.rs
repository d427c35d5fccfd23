// SPDX-License-Identifier: Apache-2.0

//! Geometry diagnostics: OGC validity, coverage gaps, sibling
//! overlaps, and nesting inside the parent level.

use codab_model::{BoundaryLayer, CheckRow, Iso3, MetricValue, QualityConfig};
use geo::{Area, BooleanOps, BoundingRect, Contains, InteriorPoint, Intersects, Validation};
use geo_types::{Geometry, MultiPolygon, Polygon};

use crate::SchemaError;

fn to_multipolygon(geometry: &Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::Polygon(p) => Some(MultiPolygon(vec![p.clone()])),
        Geometry::MultiPolygon(mp) => Some(mp.clone()),
        _ => None,
    }
}

fn layer_multipolygons(layer: &BoundaryLayer) -> Vec<Option<MultiPolygon<f64>>> {
    layer
        .features
        .iter()
        .map(|f| to_multipolygon(&f.geometry))
        .collect()
}

pub fn geometry_valid(
    iso3: &Iso3,
    levels: &[BoundaryLayer],
    _config: &QualityConfig,
) -> Result<Vec<CheckRow>, SchemaError> {
    let mut rows = Vec::new();
    for (level, layer) in levels.iter().enumerate() {
        let mut not_valid = 0i64;
        for polygons in layer_multipolygons(layer) {
            match polygons {
                Some(mp) if mp.is_valid() => {}
                // Non-polygonal or degenerate geometry on a polygon
                // layer counts as invalid rather than being skipped.
                _ => not_valid += 1,
            }
        }
        rows.push(
            CheckRow::new(iso3.clone(), level as u8)
                .with("geom_count", layer.features.len())
                .with("geom_not_valid", not_valid),
        );
    }
    Ok(rows)
}

/// Interior rings of a level's unioned coverage are areas no feature
/// claims.
pub fn geometry_gaps(
    iso3: &Iso3,
    levels: &[BoundaryLayer],
    _config: &QualityConfig,
) -> Result<Vec<CheckRow>, SchemaError> {
    let mut rows = Vec::new();
    for (level, layer) in levels.iter().enumerate() {
        let mut coverage: Option<MultiPolygon<f64>> = None;
        for polygons in layer_multipolygons(layer).into_iter().flatten() {
            coverage = Some(match coverage {
                None => polygons,
                Some(so_far) => so_far.union(&polygons),
            });
        }
        let mut gap_count = 0i64;
        let mut gap_area = 0.0f64;
        if let Some(coverage) = coverage {
            for polygon in &coverage {
                for interior in polygon.interiors() {
                    gap_count += 1;
                    gap_area += Polygon::new(interior.clone(), vec![]).unsigned_area();
                }
            }
        }
        rows.push(
            CheckRow::new(iso3.clone(), level as u8)
                .with("geom_gap_count", gap_count)
                .with("geom_gap_area", gap_area),
        );
    }
    Ok(rows)
}

pub fn geometry_overlaps_self(
    iso3: &Iso3,
    levels: &[BoundaryLayer],
    _config: &QualityConfig,
) -> Result<Vec<CheckRow>, SchemaError> {
    let mut rows = Vec::new();
    for (level, layer) in levels.iter().enumerate() {
        let polygons: Vec<MultiPolygon<f64>> = layer_multipolygons(layer)
            .into_iter()
            .flatten()
            .collect();
        let rects: Vec<_> = polygons.iter().map(BoundingRect::bounding_rect).collect();
        let mut overlap_count = 0i64;
        let mut overlap_area = 0.0f64;
        for i in 0..polygons.len() {
            for j in (i + 1)..polygons.len() {
                // Bounding-rect prefilter keeps this quadratic pass
                // cheap for real layers.
                match (&rects[i], &rects[j]) {
                    (Some(a), Some(b)) if a.intersects(b) => {}
                    _ => continue,
                }
                let shared = polygons[i].intersection(&polygons[j]);
                let area = shared.unsigned_area();
                if area > 0.0 {
                    overlap_count += 1;
                    overlap_area += area;
                }
            }
        }
        rows.push(
            CheckRow::new(iso3.clone(), level as u8)
                .with("geom_overlap_count", overlap_count)
                .with("geom_overlap_area", overlap_area),
        );
    }
    Ok(rows)
}

/// Each feature must nest in exactly one parent feature. Containment
/// is tested with an interior point so shared boundaries never count
/// against a country. Level 0 has no parent and reads as null.
pub fn geometry_within_parent(
    iso3: &Iso3,
    levels: &[BoundaryLayer],
    _config: &QualityConfig,
) -> Result<Vec<CheckRow>, SchemaError> {
    let mut rows = Vec::new();
    for (level, layer) in levels.iter().enumerate() {
        let mut row = CheckRow::new(iso3.clone(), level as u8);
        if level == 0 {
            row.set("geom_not_within_parent", MetricValue::Null);
            rows.push(row);
            continue;
        }
        let parents: Vec<MultiPolygon<f64>> = layer_multipolygons(&levels[level - 1])
            .into_iter()
            .flatten()
            .collect();
        let mut violations = 0i64;
        for polygons in layer_multipolygons(layer) {
            let probe = polygons.as_ref().and_then(InteriorPoint::interior_point);
            let Some(probe) = probe else {
                violations += 1;
                continue;
            };
            let containing = parents.iter().filter(|p| p.contains(&probe)).count();
            if containing != 1 {
                violations += 1;
            }
        }
        row.set("geom_not_within_parent", violations);
        rows.push(row);
    }
    Ok(rows)
}
