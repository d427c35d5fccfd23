// SPDX-License-Identifier: Apache-2.0

//! Diagnostics over a country's boundary layers.
//!
//! Each check is a pure function emitting one row per admin level,
//! including levels where the relevant columns are absent; the final
//! outer join is therefore never lossy. Checks are independent and
//! order-insensitive.

#![forbid(unsafe_code)]

mod attributes;
mod bcp47;
mod dates;
mod geometry;
mod languages;
mod names;
mod other;
mod pcodes;
mod script;

use codab_model::{BoundaryLayer, CheckRow, Iso3, QualityConfig, QualityTable};
use std::fmt::{Display, Formatter};

pub use bcp47::tag_is_well_formed;

pub const CRATE_NAME: &str = "codab-checks";

/// Structurally nonsensical layer encountered inside one check. Never
/// fatal: `run_checks` downgrades it to null metrics for the affected
/// rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError(pub String);

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for SchemaError {}

pub type CheckFn = fn(&Iso3, &[BoundaryLayer], &QualityConfig) -> Result<Vec<CheckRow>, SchemaError>;

pub struct CheckDef {
    pub name: &'static str,
    pub run: CheckFn,
}

/// The fixed rubric. Order only affects output column order.
pub const CHECKS: &[CheckDef] = &[
    CheckDef {
        name: "geometry_valid",
        run: geometry::geometry_valid,
    },
    CheckDef {
        name: "geometry_gaps",
        run: geometry::geometry_gaps,
    },
    CheckDef {
        name: "geometry_overlaps_self",
        run: geometry::geometry_overlaps_self,
    },
    CheckDef {
        name: "geometry_within_parent",
        run: geometry::geometry_within_parent,
    },
    CheckDef {
        name: "attribute_match",
        run: attributes::attribute_match,
    },
    CheckDef {
        name: "table_pcodes",
        run: pcodes::table_pcodes,
    },
    CheckDef {
        name: "table_names",
        run: names::table_names,
    },
    CheckDef {
        name: "dates",
        run: dates::dates,
    },
    CheckDef {
        name: "languages",
        run: languages::languages,
    },
    CheckDef {
        name: "table_other",
        run: other::table_other,
    },
];

/// Run every registered check and outer-join the rows.
///
/// A check that errors internally contributes bare rows whose metrics
/// all read as null, so one bad check never poisons the table or drops
/// a level.
#[must_use]
pub fn run_checks(iso3: &Iso3, levels: &[BoundaryLayer], config: &QualityConfig) -> QualityTable {
    let mut table = QualityTable::new();
    for check in CHECKS {
        let rows = match (check.run)(iso3, levels, config) {
            Ok(rows) => rows,
            Err(error) => {
                tracing::warn!(
                    check = check.name,
                    iso3 = iso3.as_str(),
                    error = %error,
                    "check failed, emitting null metrics"
                );
                (0..levels.len())
                    .map(|level| CheckRow::new(iso3.clone(), level as u8))
                    .collect()
            }
        };
        table.merge_rows(rows);
    }
    table
}
