// SPDX-License-Identifier: Apache-2.0

//! The score dimensions. Each rule is a conjunction of diagnostic
//! thresholds over one (country, level) row of the checks table.

use codab_model::{CheckRow, MetricValue, QualityConfig, QualityTable};

use crate::ScoreDef;

pub const SCORES: &[ScoreDef] = &[
    ScoreDef {
        name: "geometry_validity",
        run: geometry_validity,
    },
    ScoreDef {
        name: "geometry_topology",
        run: geometry_topology,
    },
    ScoreDef {
        name: "attributes",
        run: attributes,
    },
    ScoreDef {
        name: "pcodes",
        run: pcodes,
    },
    ScoreDef {
        name: "names",
        run: names,
    },
    ScoreDef {
        name: "languages",
        run: languages,
    },
    ScoreDef {
        name: "dates",
        run: dates,
    },
    ScoreDef {
        name: "other_columns",
        run: other_columns,
    },
];

fn eq(value: &MetricValue, want: i64) -> bool {
    value.as_i64() == Some(want)
}

/// Null reads as zero findings: a metric that could not be measured
/// for structural reasons (level 0 has no parent) never fails a
/// dimension on its own.
fn zero_or_null(value: &MetricValue) -> bool {
    value.is_null() || eq(value, 0)
}

fn rule_rows(
    diagnostics: &QualityTable,
    name: &str,
    pass: impl Fn(&codab_model::Iso3, u8) -> bool,
) -> Vec<CheckRow> {
    diagnostics
        .keys()
        .map(|(iso3, level)| {
            CheckRow::new(iso3.clone(), *level).with(name, pass(iso3, *level))
        })
        .collect()
}

fn geometry_validity(diagnostics: &QualityTable, _config: &QualityConfig) -> Vec<CheckRow> {
    rule_rows(diagnostics, "geometry_validity", |iso3, level| {
        eq(diagnostics.get(iso3, level, "geom_not_valid"), 0)
    })
}

fn geometry_topology(diagnostics: &QualityTable, _config: &QualityConfig) -> Vec<CheckRow> {
    rule_rows(diagnostics, "geometry_topology", |iso3, level| {
        eq(diagnostics.get(iso3, level, "geom_gap_count"), 0)
            && eq(diagnostics.get(iso3, level, "geom_overlap_count"), 0)
            && zero_or_null(diagnostics.get(iso3, level, "geom_not_within_parent"))
    })
}

fn attributes(diagnostics: &QualityTable, _config: &QualityConfig) -> Vec<CheckRow> {
    rule_rows(diagnostics, "attributes", |iso3, level| {
        zero_or_null(diagnostics.get(iso3, level, "attr_parent_mismatch"))
    })
}

fn pcodes(diagnostics: &QualityTable, _config: &QualityConfig) -> Vec<CheckRow> {
    rule_rows(diagnostics, "pcodes", |iso3, level| {
        let full_coverage = diagnostics
            .get(iso3, level, "pcode_column_levels")
            .as_i64()
            .is_some_and(|v| v == i64::from(level) + 1);
        full_coverage
            && eq(diagnostics.get(iso3, level, "pcode_empty"), 0)
            && eq(diagnostics.get(iso3, level, "pcode_not_iso"), 0)
            && eq(diagnostics.get(iso3, level, "pcode_not_alnum"), 0)
            && diagnostics
                .get(iso3, level, "pcode_lengths")
                .as_i64()
                .is_some_and(|v| v <= 1)
            && eq(diagnostics.get(iso3, level, "pcode_duplicated"), 0)
            && eq(diagnostics.get(iso3, level, "pcode_not_nested"), 0)
    })
}

fn names(diagnostics: &QualityTable, _config: &QualityConfig) -> Vec<CheckRow> {
    rule_rows(diagnostics, "names", |iso3, level| {
        let full_coverage = diagnostics
            .get(iso3, level, "name_column_levels")
            .as_i64()
            .is_some_and(|v| v == i64::from(level) + 1);
        full_coverage
            && eq(diagnostics.get(iso3, level, "name_empty"), 0)
            && eq(diagnostics.get(iso3, level, "name_spaces_strip"), 0)
            && eq(diagnostics.get(iso3, level, "name_spaces_double"), 0)
            // Whole-column case anomalies fail; a single shouting cell
            // does not.
            && eq(diagnostics.get(iso3, level, "name_upper_column"), 0)
            && eq(diagnostics.get(iso3, level, "name_lower_column"), 0)
            && eq(diagnostics.get(iso3, level, "name_numbers"), 0)
            && eq(diagnostics.get(iso3, level, "name_no_valid"), 0)
            && eq(diagnostics.get(iso3, level, "name_invalid"), 0)
            && eq(diagnostics.get(iso3, level, "name_invalid_adm0"), 0)
    })
}

fn languages(diagnostics: &QualityTable, config: &QualityConfig) -> Vec<CheckRow> {
    rule_rows(diagnostics, "languages", |iso3, level| {
        let count = diagnostics.get(iso3, level, "language_count").as_i64();
        let primary_romanized = diagnostics
            .get(iso3, level, "language_0")
            .as_text()
            .is_some_and(|tag| config.is_romanized(tag));
        let parent = diagnostics.get(iso3, level, "language_parent");
        let inherits = parent.is_null()
            || count.zip(parent.as_i64()).is_some_and(|(c, p)| c <= p);
        count.is_some_and(|c| c >= 1)
            && eq(diagnostics.get(iso3, level, "language_invalid"), 0)
            && primary_romanized
            && inherits
    })
}

fn dates(diagnostics: &QualityTable, _config: &QualityConfig) -> Vec<CheckRow> {
    rule_rows(diagnostics, "dates", |iso3, level| {
        eq(diagnostics.get(iso3, level, "valid_on_count"), 1)
            && eq(diagnostics.get(iso3, level, "valid_to_empty"), 1)
    })
}

fn other_columns(diagnostics: &QualityTable, _config: &QualityConfig) -> Vec<CheckRow> {
    rule_rows(diagnostics, "other_columns", |iso3, level| {
        eq(diagnostics.get(iso3, level, "other_column_count"), 0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use codab_model::Iso3;

    fn iso3() -> Iso3 {
        Iso3::parse("CAF").expect("iso3")
    }

    fn table(rows: Vec<CheckRow>) -> QualityTable {
        let mut t = QualityTable::new();
        t.merge_rows(rows);
        t
    }

    #[test]
    fn date_score_truth_table() {
        let cases = [
            (1i64, 1i64, true),
            (1, 0, false),
            (2, 1, false),
            (0, 1, false),
        ];
        for (count, empty, want) in cases {
            let diagnostics = table(vec![CheckRow::new(iso3(), 0)
                .with("valid_on_count", count)
                .with("valid_to_empty", empty)]);
            let rows = dates(&diagnostics, &QualityConfig::default());
            assert_eq!(
                rows[0].get("dates").as_i64(),
                Some(i64::from(want)),
                "valid_on_count={count} valid_to_empty={empty}"
            );
        }
    }

    #[test]
    fn language_inheritance_failure() {
        // Child declares three languages under a parent with one.
        let diagnostics = table(vec![
            CheckRow::new(iso3(), 0)
                .with("language_count", 1i64)
                .with("language_invalid", 0i64)
                .with("language_0", "fr")
                .with("language_parent", MetricValue::Null),
            CheckRow::new(iso3(), 1)
                .with("language_count", 3i64)
                .with("language_invalid", 0i64)
                .with("language_0", "fr")
                .with("language_parent", 1i64),
        ]);
        let rows = languages(&diagnostics, &QualityConfig::default());
        assert_eq!(rows[0].get("languages").as_i64(), Some(1));
        assert_eq!(rows[1].get("languages").as_i64(), Some(0));
    }

    #[test]
    fn non_romanized_primary_language_fails() {
        let diagnostics = table(vec![CheckRow::new(iso3(), 0)
            .with("language_count", 1i64)
            .with("language_invalid", 0i64)
            .with("language_0", "ar")
            .with("language_parent", MetricValue::Null)]);
        let rows = languages(&diagnostics, &QualityConfig::default());
        assert_eq!(rows[0].get("languages").as_i64(), Some(0));
    }

    #[test]
    fn topology_passes_at_level_zero_where_containment_is_null() {
        let diagnostics = table(vec![CheckRow::new(iso3(), 0)
            .with("geom_gap_count", 0i64)
            .with("geom_overlap_count", 0i64)
            .with("geom_not_within_parent", MetricValue::Null)]);
        let rows = geometry_topology(&diagnostics, &QualityConfig::default());
        assert_eq!(rows[0].get("geometry_topology").as_i64(), Some(1));
    }

    #[test]
    fn pcode_dimension_requires_full_level_coverage() {
        let diagnostics = table(vec![CheckRow::new(iso3(), 1)
            .with("pcode_column_levels", 1i64)
            .with("pcode_empty", 0i64)
            .with("pcode_not_iso", 0i64)
            .with("pcode_not_alnum", 0i64)
            .with("pcode_lengths", 1i64)
            .with("pcode_duplicated", 0i64)
            .with("pcode_not_nested", 0i64)]);
        let rows = pcodes(&diagnostics, &QualityConfig::default());
        assert_eq!(rows[0].get("pcodes").as_i64(), Some(0));
    }
}
