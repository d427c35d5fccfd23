// SPDX-License-Identifier: Apache-2.0

//! Review-date consistency. `valid_on` is the last-reviewed stamp and
//! should be a single value per level; extra distinct values spill
//! into `valid_on_1`, `valid_on_2`, ... so the artifact shows exactly
//! which stamps disagree. `valid_to` marks the active/indefinite
//! convention: the column should exist and be entirely empty.

use codab_model::{BoundaryLayer, CheckRow, Iso3, QualityConfig, COL_VALID_ON, COL_VALID_TO};

use crate::SchemaError;

pub fn dates(
    iso3: &Iso3,
    levels: &[BoundaryLayer],
    _config: &QualityConfig,
) -> Result<Vec<CheckRow>, SchemaError> {
    let mut rows = Vec::new();
    for (level, layer) in levels.iter().enumerate() {
        let mut row = CheckRow::new(iso3.clone(), level as u8);

        // Date-typed fields arrive as epoch-millisecond numbers, so
        // distinctness is over the rendered scalar, not text alone.
        let mut distinct: Vec<String> = Vec::new();
        if layer.has_column(COL_VALID_ON) {
            for feature in &layer.features {
                let value = feature.attr(COL_VALID_ON);
                if value.is_empty() {
                    continue;
                }
                if let Some(stamp) = value.render() {
                    let stamp = stamp.trim().to_string();
                    if !distinct.contains(&stamp) {
                        distinct.push(stamp);
                    }
                }
            }
        }
        row.set("valid_on_count", distinct.len());
        for (index, value) in distinct.iter().enumerate() {
            if index == 0 {
                row.set(COL_VALID_ON, value.as_str());
            } else {
                row.set(&format!("valid_on_{index}"), value.as_str());
            }
        }

        let exists = layer.has_column(COL_VALID_TO);
        row.set("valid_to_exists", i64::from(exists));
        let all_empty = exists
            && layer
                .features
                .iter()
                .all(|f| f.attr(COL_VALID_TO).is_empty());
        row.set("valid_to_empty", i64::from(all_empty));

        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codab_model::{AttrValue, BoundaryFeature};
    use geo_types::{Geometry, GeometryCollection};

    fn feature(pairs: &[(&str, &str)]) -> BoundaryFeature {
        BoundaryFeature {
            geometry: Geometry::GeometryCollection(GeometryCollection(vec![])),
            attributes: pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), AttrValue::Text((*v).to_string())))
                .collect(),
        }
    }

    fn iso3() -> Iso3 {
        Iso3::parse("MDG").expect("iso3")
    }

    #[test]
    fn single_review_date_with_empty_valid_to() {
        let layer = BoundaryLayer::new(
            vec!["valid_on".to_string(), "valid_to".to_string()],
            vec![
                feature(&[("valid_on", "2024-01-15"), ("valid_to", "")]),
                feature(&[("valid_on", "2024-01-15"), ("valid_to", "")]),
            ],
        );
        let rows = dates(&iso3(), &[layer], &QualityConfig::default()).expect("check");
        let row = &rows[0];
        assert_eq!(row.get("valid_on_count").as_i64(), Some(1));
        assert_eq!(row.get("valid_on").as_text(), Some("2024-01-15"));
        assert_eq!(row.get("valid_to_exists").as_i64(), Some(1));
        assert_eq!(row.get("valid_to_empty").as_i64(), Some(1));
    }

    #[test]
    fn conflicting_dates_spill_into_numbered_columns() {
        let layer = BoundaryLayer::new(
            vec!["valid_on".to_string()],
            vec![
                feature(&[("valid_on", "2024-01-15")]),
                feature(&[("valid_on", "2023-06-01")]),
            ],
        );
        let rows = dates(&iso3(), &[layer], &QualityConfig::default()).expect("check");
        let row = &rows[0];
        assert_eq!(row.get("valid_on_count").as_i64(), Some(2));
        assert_eq!(row.get("valid_on").as_text(), Some("2024-01-15"));
        assert_eq!(row.get("valid_on_1").as_text(), Some("2023-06-01"));
        assert_eq!(row.get("valid_to_exists").as_i64(), Some(0));
        assert_eq!(row.get("valid_to_empty").as_i64(), Some(0));
    }

    #[test]
    fn epoch_millisecond_review_stamps_are_counted() {
        let mut first = feature(&[]);
        first.attributes.insert(
            "valid_on".to_string(),
            AttrValue::Number(1_705_276_800_000.0),
        );
        let second = first.clone();
        let layer = BoundaryLayer::new(vec!["valid_on".to_string()], vec![first, second]);
        let rows = dates(&iso3(), &[layer], &QualityConfig::default()).expect("check");
        let row = &rows[0];
        assert_eq!(row.get("valid_on_count").as_i64(), Some(1));
        assert_eq!(row.get("valid_on").as_text(), Some("1705276800000"));
    }

    #[test]
    fn populated_valid_to_is_not_empty() {
        let layer = BoundaryLayer::new(
            vec!["valid_to".to_string()],
            vec![feature(&[("valid_to", "2025-01-01")])],
        );
        let rows = dates(&iso3(), &[layer], &QualityConfig::default()).expect("check");
        assert_eq!(rows[0].get("valid_to_exists").as_i64(), Some(1));
        assert_eq!(rows[0].get("valid_to_empty").as_i64(), Some(0));
    }
}
