// SPDX-License-Identifier: Apache-2.0

//! Name-column conventions: coverage, emptiness, duplicates, spacing
//! and case anomalies, embedded digits, and script-aware character
//! validation per declared language.

use codab_model::{name_suffix_index, BoundaryLayer, CheckRow, Iso3, QualityConfig, SchemaIndex};
use std::collections::BTreeSet;

use crate::languages::declared_languages;
use crate::script::{invalid_chars, is_punctuation_only, script_for};
use crate::SchemaError;

fn has_strippable_spaces(s: &str) -> bool {
    s != s.trim()
}

fn has_double_spaces(s: &str) -> bool {
    s.contains("  ")
}

fn is_upper(s: &str) -> bool {
    let mut has_letter = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            has_letter = true;
            if c.is_lowercase() {
                return false;
            }
        }
    }
    has_letter
}

fn is_lower(s: &str) -> bool {
    let mut has_letter = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            has_letter = true;
            if c.is_uppercase() {
                return false;
            }
        }
    }
    has_letter
}

fn has_numbers(s: &str) -> bool {
    s.chars().any(|c| c.is_numeric())
}

/// National names never carry parenthesized qualifiers, slashes, or
/// placeholder "admin" tokens.
fn is_invalid_adm0(s: &str) -> bool {
    let lower = s.to_lowercase();
    lower.contains('(')
        || lower.contains(')')
        || lower.contains('/')
        || lower.contains('\\')
        || lower.split(|c: char| !c.is_alphanumeric()).any(|w| w == "admin")
}

pub fn table_names(
    iso3: &Iso3,
    levels: &[BoundaryLayer],
    _config: &QualityConfig,
) -> Result<Vec<CheckRow>, SchemaError> {
    let mut rows = Vec::new();
    for (level, layer) in levels.iter().enumerate() {
        let schema = SchemaIndex::resolve(layer, level as u8);
        let langs = declared_languages(layer, &schema);
        // One column per declared language; the base column is always
        // in scope even when no language is declared.
        let limit = langs.len().max(1);
        let name_columns = schema.name_columns_within(limit);

        let column_levels = (0..=level)
            .filter(|l| {
                let prefix = format!("adm{l}_name");
                schema.name_columns.iter().any(|c| c.starts_with(&prefix))
            })
            .count();
        let cell_count = (name_columns.len() * layer.features.len()).max(1);

        let mut empty = 0i64;
        let mut empty_column = 0i64;
        let mut spaces_strip = 0i64;
        let mut spaces_double = 0i64;
        let mut upper = 0i64;
        let mut upper_column = 0i64;
        let mut lower = 0i64;
        let mut lower_column = 0i64;
        let mut numbers = 0i64;
        let mut numbers_column = 0i64;
        for column in &name_columns {
            let cells: Vec<&str> = layer
                .features
                .iter()
                .map(|f| f.attr(column).as_text().unwrap_or(""))
                .collect();
            empty += cells.iter().filter(|c| c.trim().is_empty()).count() as i64;
            if cells.iter().all(|c| c.trim().is_empty()) {
                empty_column += 1;
            }
            spaces_strip += cells.iter().filter(|c| has_strippable_spaces(c)).count() as i64;
            spaces_double += cells.iter().filter(|c| has_double_spaces(c)).count() as i64;
            upper += cells.iter().filter(|c| is_upper(c)).count() as i64;
            if !cells.is_empty() && cells.iter().all(|c| is_upper(c)) {
                upper_column += 1;
            }
            lower += cells.iter().filter(|c| is_lower(c)).count() as i64;
            if !cells.is_empty() && cells.iter().all(|c| is_lower(c)) {
                lower_column += 1;
            }
            numbers += cells.iter().filter(|c| has_numbers(c)).count() as i64;
            if !cells.is_empty() && cells.iter().all(|c| has_numbers(c)) {
                numbers_column += 1;
            }
        }

        // Full-row duplicates over the in-scope name columns.
        let mut seen_rows: BTreeSet<Vec<String>> = BTreeSet::new();
        let mut duplicated = 0i64;
        if !name_columns.is_empty() {
            for feature in &layer.features {
                let key: Vec<String> = name_columns
                    .iter()
                    .map(|c| feature.attr(c).as_text().unwrap_or("").to_string())
                    .collect();
                if !seen_rows.insert(key) {
                    duplicated += 1;
                }
            }
        }

        let mut invalid_set: BTreeSet<char> = BTreeSet::new();
        let mut no_valid = 0i64;
        let mut invalid = 0i64;
        let mut invalid_adm0 = 0i64;
        for (index, lang) in langs.iter().enumerate() {
            let script = script_for(lang);
            let lang_columns: Vec<&str> = name_columns
                .iter()
                .copied()
                .filter(|c| name_suffix_index(c) == Some(index))
                .collect();
            for column in &lang_columns {
                let mut any_invalid_adm0 = false;
                for feature in &layer.features {
                    let Some(name) = feature.attr(column).as_text() else {
                        continue;
                    };
                    if name.trim().is_empty() {
                        continue;
                    }
                    let bad = invalid_chars(script, name);
                    if !bad.is_empty() {
                        invalid += 1;
                        invalid_set.extend(bad);
                    }
                    if is_punctuation_only(script, name) {
                        no_valid += 1;
                    }
                    if column.starts_with("adm0_name") && is_invalid_adm0(name) {
                        any_invalid_adm0 = true;
                    }
                }
                if any_invalid_adm0 {
                    invalid_adm0 += 1;
                }
            }
        }
        let invalid_chars_rendered = invalid_set
            .iter()
            .map(|c| format!("U+{:04X}", *c as u32))
            .collect::<Vec<_>>()
            .join(",");

        rows.push(
            CheckRow::new(iso3.clone(), level as u8)
                .with("name_column_levels", column_levels)
                .with("name_column_count", schema.name_columns.len())
                .with("name_cell_count", cell_count)
                .with("name_empty", empty)
                .with("name_empty_column", empty_column)
                .with("name_duplicated", duplicated)
                .with("name_spaces_strip", spaces_strip)
                .with("name_spaces_double", spaces_double)
                .with("name_upper", upper)
                .with("name_upper_column", upper_column)
                .with("name_lower", lower)
                .with("name_lower_column", lower_column)
                .with("name_numbers", numbers)
                .with("name_numbers_column", numbers_column)
                .with("name_no_valid", no_valid)
                .with("name_invalid", invalid)
                .with("name_invalid_adm0", invalid_adm0)
                .with("name_invalid_char_count", invalid_set.len())
                .with("name_invalid_chars", invalid_chars_rendered),
        );
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
        Iso3::parse("CAF").expect("iso3")
    }

    fn layer(columns: &[&str], features: Vec<BoundaryFeature>) -> BoundaryLayer {
        BoundaryLayer::new(
            columns.iter().map(|c| (*c).to_string()).collect(),
            features,
        )
    }

    #[test]
    fn clean_names_produce_zero_findings() {
        let levels = vec![layer(
            &["adm0_name", "adm0_pcode", "lang"],
            vec![feature(&[
                ("adm0_name", "Central African Republic"),
                ("adm0_pcode", "CF"),
                ("lang", "en"),
            ])],
        )];
        let rows = table_names(&iso3(), &levels, &QualityConfig::default()).expect("check");
        let row = &rows[0];
        assert_eq!(row.get("name_column_levels").as_i64(), Some(1));
        assert_eq!(row.get("name_empty").as_i64(), Some(0));
        assert_eq!(row.get("name_invalid").as_i64(), Some(0));
        assert_eq!(row.get("name_invalid_adm0").as_i64(), Some(0));
        assert_eq!(row.get("name_invalid_chars").as_text(), Some(""));
    }

    #[test]
    fn spacing_case_digit_and_duplicate_findings() {
        let levels = vec![layer(
            &["adm0_name", "lang"],
            vec![
                feature(&[("adm0_name", " Bangui "), ("lang", "fr")]),
                feature(&[("adm0_name", "OMBELLA  MPOKO"), ("lang", "fr")]),
                feature(&[("adm0_name", "Zone 4"), ("lang", "fr")]),
                feature(&[("adm0_name", "Zone 4"), ("lang", "fr")]),
            ],
        )];
        let rows = table_names(&iso3(), &levels, &QualityConfig::default()).expect("check");
        let row = &rows[0];
        assert_eq!(row.get("name_spaces_strip").as_i64(), Some(1));
        assert_eq!(row.get("name_spaces_double").as_i64(), Some(1));
        assert_eq!(row.get("name_upper").as_i64(), Some(1));
        assert_eq!(row.get("name_numbers").as_i64(), Some(2));
        assert_eq!(row.get("name_duplicated").as_i64(), Some(1));
    }

    #[test]
    fn invalid_characters_reported_as_sorted_codepoint_set() {
        let levels = vec![layer(
            &["adm0_name", "lang"],
            vec![feature(&[
                ("adm0_name", "Ce\u{044F}tral Af\u{0416}ica\u{0416} (admin)"),
                ("lang", "en"),
            ])],
        )];
        let rows = table_names(&iso3(), &levels, &QualityConfig::default()).expect("check");
        let row = &rows[0];
        assert_eq!(row.get("name_invalid").as_i64(), Some(1));
        assert_eq!(row.get("name_invalid_adm0").as_i64(), Some(1));
        // Deduplicated, sorted, comma-joined code points. Parens are
        // also out of script for Latin names.
        assert_eq!(
            row.get("name_invalid_chars").as_text(),
            Some("U+0028,U+0029,U+0416,U+044F")
        );
        assert_eq!(row.get("name_invalid_char_count").as_i64(), Some(4));
    }

    #[test]
    fn levels_without_name_columns_still_emit_rows() {
        let levels = vec![layer(&["adm0_pcode"], vec![feature(&[("adm0_pcode", "CF")])])];
        let rows = table_names(&iso3(), &levels, &QualityConfig::default()).expect("check");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name_column_count").as_i64(), Some(0));
        assert_eq!(rows[0].get("name_cell_count").as_i64(), Some(1));
    }
}
