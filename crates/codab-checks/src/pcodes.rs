// SPDX-License-Identifier: Apache-2.0

//! P-code structure: coverage, emptiness, prefix discipline, length
//! variance, duplicates, and nesting under the parent code.

use codab_model::{BoundaryLayer, CheckRow, Iso3, QualityConfig, SchemaIndex};
use std::collections::{BTreeMap, BTreeSet};

use crate::SchemaError;

pub fn table_pcodes(
    iso3: &Iso3,
    levels: &[BoundaryLayer],
    _config: &QualityConfig,
) -> Result<Vec<CheckRow>, SchemaError> {
    let iso2 = iso3.iso2();
    let mut rows = Vec::new();
    for (level, layer) in levels.iter().enumerate() {
        let schema = SchemaIndex::resolve(layer, level as u8);
        let columns = &schema.pcode_columns;
        let cell_count = (columns.len() * layer.features.len()).max(1);

        let mut empty = 0i64;
        let mut not_iso = 0i64;
        let mut not_alnum = 0i64;
        for feature in &layer.features {
            for column in columns {
                let value = feature.attr(column);
                if value.is_empty() {
                    empty += 1;
                    continue;
                }
                // Prefix and character findings apply to text codes
                // only; a numeric scalar has nothing to inspect.
                let Some(code) = value.as_text() else {
                    continue;
                };
                let starts_iso = code.starts_with(iso3.as_str())
                    || iso2.is_some_and(|iso2| code.starts_with(iso2));
                if !starts_iso {
                    not_iso += 1;
                }
                if !code.chars().all(char::is_alphanumeric) {
                    not_alnum += 1;
                }
            }
        }

        let mut lengths = 0i64;
        let mut duplicated = 0i64;
        let mut not_nested = 0i64;
        if let Some(own) = schema.own_pcode_column() {
            let own_codes: Vec<&str> = layer
                .features
                .iter()
                .filter_map(|f| f.attr(own).as_text())
                .filter(|c| !c.trim().is_empty())
                .collect();
            lengths = own_codes
                .iter()
                .map(|c| c.len())
                .collect::<BTreeSet<_>>()
                .len() as i64;
            let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
            for code in &own_codes {
                let slot = seen.entry(code).or_insert(0);
                *slot += 1;
                if *slot > 1 {
                    duplicated += 1;
                }
            }
            if let Some(parent) = schema.parent_pcode_column() {
                for feature in &layer.features {
                    let own_code = feature.attr(own).as_text().filter(|c| !c.trim().is_empty());
                    let parent_code = feature
                        .attr(parent)
                        .as_text()
                        .filter(|c| !c.trim().is_empty());
                    if let (Some(own_code), Some(parent_code)) = (own_code, parent_code) {
                        if !own_code.starts_with(parent_code) {
                            not_nested += 1;
                        }
                    }
                }
            }
        }

        rows.push(
            CheckRow::new(iso3.clone(), level as u8)
                .with("pcode_column_levels", columns.len())
                .with("pcode_cell_count", cell_count)
                .with("pcode_empty", empty)
                .with("pcode_not_iso", not_iso)
                .with("pcode_not_alnum", not_alnum)
                .with("pcode_lengths", lengths)
                .with("pcode_duplicated", duplicated)
                .with("pcode_not_nested", not_nested),
        );
    }
    Ok(rows)
}
