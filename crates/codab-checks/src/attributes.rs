// SPDX-License-Identifier: Apache-2.0

//! Cross-level attribute consistency: every parent-referenced column
//! on a child row must agree with the parent row located by parent
//! P-code.

use codab_model::{BoundaryFeature, BoundaryLayer, CheckRow, Iso3, MetricValue, QualityConfig,
    SchemaIndex};
use std::collections::BTreeMap;

use crate::SchemaError;

pub fn attribute_match(
    iso3: &Iso3,
    levels: &[BoundaryLayer],
    _config: &QualityConfig,
) -> Result<Vec<CheckRow>, SchemaError> {
    let mut rows = Vec::new();
    for (level, layer) in levels.iter().enumerate() {
        let mut row = CheckRow::new(iso3.clone(), level as u8);
        if level == 0 {
            row.set("attr_parent_missing", MetricValue::Null);
            row.set("attr_parent_mismatch", MetricValue::Null);
            rows.push(row);
            continue;
        }
        let schema = SchemaIndex::resolve(layer, level as u8);
        let parent_level = (level - 1) as u8;
        let parent_layer = &levels[level - 1];
        let parent_schema = SchemaIndex::resolve(parent_layer, parent_level);
        let parent_key = parent_schema.own_pcode_column();

        let mut parents: BTreeMap<&str, &BoundaryFeature> = BTreeMap::new();
        if let Some(key) = parent_key {
            for feature in &parent_layer.features {
                if let Some(pcode) = feature.attr(key).as_text() {
                    if !pcode.trim().is_empty() {
                        parents.insert(pcode, feature);
                    }
                }
            }
        }

        // Columns describing the parent that both levels carry.
        let inherited: Vec<&str> = schema
            .name_columns
            .iter()
            .chain(schema.pcode_columns.iter())
            .filter(|c| {
                !c.starts_with(&format!("adm{level}_")) && parent_layer.has_column(c)
            })
            .map(String::as_str)
            .collect();

        let mut missing = 0i64;
        let mut mismatch = 0i64;
        for feature in &layer.features {
            let reference = schema
                .parent_pcode_column()
                .and_then(|c| feature.attr(c).as_text())
                .filter(|p| !p.trim().is_empty());
            let Some(reference) = reference else {
                missing += 1;
                continue;
            };
            let Some(parent) = parents.get(reference) else {
                missing += 1;
                continue;
            };
            for column in &inherited {
                if feature.attr(column) != parent.attr(column) {
                    mismatch += 1;
                }
            }
        }
        row.set("attr_parent_missing", missing);
        row.set("attr_parent_mismatch", mismatch);
        rows.push(row);
    }
    Ok(rows)
}
