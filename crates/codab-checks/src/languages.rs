// SPDX-License-Identifier: Apache-2.0

//! Declared-language diagnostics: tag well-formedness, mixed-language
//! columns, and the parent-level count used by the inheritance score.

use codab_model::{BoundaryLayer, CheckRow, Iso3, MetricValue, QualityConfig, SchemaIndex};

use crate::bcp47::tag_is_well_formed;
use crate::SchemaError;

/// Language tags a layer declares, one per `lang*` column (first
/// non-empty value), in column order.
pub(crate) fn declared_languages(layer: &BoundaryLayer, schema: &SchemaIndex) -> Vec<String> {
    schema
        .lang_columns
        .iter()
        .filter_map(|column| {
            layer.features.iter().find_map(|f| {
                f.attr(column)
                    .as_text()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(ToString::to_string)
            })
        })
        .collect()
}

fn distinct_tags(layer: &BoundaryLayer, column: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for feature in &layer.features {
        let Some(tag) = feature.attr(column).as_text() else {
            continue;
        };
        let tag = tag.trim();
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

pub fn languages(
    iso3: &Iso3,
    levels: &[BoundaryLayer],
    _config: &QualityConfig,
) -> Result<Vec<CheckRow>, SchemaError> {
    let mut rows = Vec::new();
    let mut parent_count: Option<i64> = None;
    for (level, layer) in levels.iter().enumerate() {
        let schema = SchemaIndex::resolve(layer, level as u8);
        let mut row = CheckRow::new(iso3.clone(), level as u8);
        let mut count = 0i64;
        let mut mix = 0i64;
        let mut invalid = 0i64;
        row.set("language_count", 0i64);
        row.set("language_mix", 0i64);
        row.set(
            "language_parent",
            parent_count.map_or(MetricValue::Null, MetricValue::Int),
        );
        row.set("language_invalid", 0i64);
        for (index, column) in schema.lang_columns.iter().enumerate() {
            let tags = distinct_tags(layer, column);
            if tags.len() > 1 {
                mix += 1;
            }
            for tag in &tags {
                if tag_is_well_formed(tag) {
                    count += 1;
                } else {
                    invalid += 1;
                }
                row.set(&format!("language_{index}"), tag.as_str());
            }
        }
        row.set("language_count", count);
        row.set("language_mix", mix);
        row.set("language_invalid", invalid);
        parent_count = Some(count);
        rows.push(row);
    }
    Ok(rows)
}
