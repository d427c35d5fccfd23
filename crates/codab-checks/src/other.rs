// SPDX-License-Identifier: Apache-2.0

//! Schema drift: columns outside the known name/pcode/ref/misc
//! allowlist.

use codab_model::{BoundaryLayer, CheckRow, Iso3, QualityConfig, SchemaIndex};

use crate::SchemaError;

pub fn table_other(
    iso3: &Iso3,
    levels: &[BoundaryLayer],
    config: &QualityConfig,
) -> Result<Vec<CheckRow>, SchemaError> {
    let mut rows = Vec::new();
    for (level, layer) in levels.iter().enumerate() {
        let schema = SchemaIndex::resolve(layer, level as u8);
        let known = |column: &String| {
            schema.name_columns.contains(column)
                || schema.pcode_columns.contains(column)
                || schema.ref_columns.contains(column)
                || config.misc_columns.contains(column)
        };
        let other: Vec<&str> = layer
            .columns
            .iter()
            .filter(|c| !known(c))
            .map(String::as_str)
            .collect();
        rows.push(
            CheckRow::new(iso3.clone(), level as u8)
                .with("ref_name_column_count", schema.ref_columns.len())
                .with("ref_name_columns", schema.ref_columns.join(","))
                .with("other_column_count", other.len())
                .with("other_columns", other.join(",")),
        );
    }
    Ok(rows)
}
