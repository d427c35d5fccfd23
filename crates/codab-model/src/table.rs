// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use crate::Iso3;

/// Scalar produced by a check or score. `Null` means "not measured",
/// which downstream scoring treats differently from a measured zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl MetricValue {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric coercion used by aggregation: booleans map to {0, 1},
    /// ratios are clamped into [0, 1] by the caller when required.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Bool(b) => Some(f64::from(u8::from(*b))),
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(_) | Self::Null => None,
        }
    }

    /// Cell rendering for the delimited artifact; nulls are empty.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Self::Int(v) => v.to_string(),
            Self::Float(v) => format!("{v}"),
            Self::Text(s) => s.clone(),
            Self::Null => String::new(),
        }
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<usize> for MetricValue {
    fn from(v: usize) -> Self {
        Self::Int(v as i64)
    }
}

impl From<bool> for MetricValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// One check's output for one (country, level) pair. Metric order is
/// preserved so the joined table keeps author-intended column order.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckRow {
    pub iso3: Iso3,
    pub level: u8,
    metrics: Vec<(String, MetricValue)>,
}

impl CheckRow {
    #[must_use]
    pub fn new(iso3: Iso3, level: u8) -> Self {
        Self {
            iso3,
            level,
            metrics: Vec::new(),
        }
    }

    pub fn set(&mut self, name: &str, value: impl Into<MetricValue>) {
        let value = value.into();
        if let Some(slot) = self.metrics.iter_mut().find(|(n, _)| n == name) {
            slot.1 = value;
        } else {
            self.metrics.push((name.to_string(), value));
        }
    }

    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<MetricValue>) -> Self {
        self.set(name, value);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> &MetricValue {
        self.metrics
            .iter()
            .find(|(n, _)| n == name)
            .map_or(&MetricValue::Null, |(_, v)| v)
    }

    #[must_use]
    pub fn metrics(&self) -> &[(String, MetricValue)] {
        &self.metrics
    }
}

/// Outer join of check (or score) rows on (iso3, level).
///
/// The column set is the union of every merged row's metrics in
/// first-seen order; a key missing a metric reads as `Null`, never as
/// a dropped row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QualityTable {
    columns: Vec<String>,
    rows: BTreeMap<(Iso3, u8), BTreeMap<String, MetricValue>>,
}

impl QualityTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge_rows(&mut self, rows: Vec<CheckRow>) {
        for row in rows {
            let key = (row.iso3.clone(), row.level);
            let slot = self.rows.entry(key).or_default();
            for (name, value) in row.metrics {
                if !self.columns.iter().any(|c| *c == name) {
                    self.columns.push(name.clone());
                }
                slot.insert(name, value);
            }
        }
    }

    /// Outer-join another table into this one.
    pub fn merge_table(&mut self, other: &Self) {
        for ((iso3, level), row) in &other.rows {
            let slot = self.rows.entry((iso3.clone(), *level)).or_default();
            for column in &other.columns {
                if !self.columns.iter().any(|c| c == column) {
                    self.columns.push(column.clone());
                }
                if let Some(value) = row.get(column) {
                    slot.insert(column.clone(), value.clone());
                }
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn keys(&self) -> impl Iterator<Item = &(Iso3, u8)> {
        self.rows.keys()
    }

    #[must_use]
    pub fn get(&self, iso3: &Iso3, level: u8, column: &str) -> &MetricValue {
        self.rows
            .get(&(iso3.clone(), level))
            .and_then(|row| row.get(column))
            .map_or(&MetricValue::Null, |v| v)
    }

    /// Countries present in the table, deduplicated, in order.
    #[must_use]
    pub fn countries(&self) -> Vec<Iso3> {
        let mut seen = Vec::new();
        for (iso3, _) in self.rows.keys() {
            if seen.last() != Some(iso3) {
                seen.push(iso3.clone());
            }
        }
        seen
    }

    /// Levels present for one country, ascending.
    #[must_use]
    pub fn levels_for(&self, iso3: &Iso3) -> Vec<u8> {
        self.rows
            .keys()
            .filter(|(i, _)| i == iso3)
            .map(|(_, level)| *level)
            .collect()
    }

    /// Delimited UTF-8 rendering: header `iso3,level,<columns>`, one
    /// line per key, null cells empty. Cells containing the delimiter
    /// or quotes are quoted.
    #[must_use]
    pub fn to_delimited(&self) -> String {
        let mut out = String::new();
        out.push_str("iso3,level");
        for column in &self.columns {
            out.push(',');
            out.push_str(&escape_cell(column));
        }
        out.push('\n');
        for ((iso3, level), row) in &self.rows {
            let _ = write!(out, "{iso3},{level}");
            for column in &self.columns {
                out.push(',');
                let cell = row
                    .get(column)
                    .map_or_else(String::new, MetricValue::render);
                out.push_str(&escape_cell(&cell));
            }
            out.push('\n');
        }
        out
    }

    pub fn write_delimited(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.to_delimited())
    }
}

fn escape_cell(cell: &str) -> String {
    if cell.contains(',') || cell.contains('"') || cell.contains('\n') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iso3(code: &str) -> Iso3 {
        Iso3::parse(code).expect("iso3")
    }

    #[test]
    fn outer_join_keeps_union_of_keys_with_null_fills() {
        let mut table = QualityTable::new();
        table.merge_rows(vec![
            CheckRow::new(iso3("CAF"), 0).with("a", 1i64),
            CheckRow::new(iso3("CAF"), 1).with("a", 2i64),
        ]);
        table.merge_rows(vec![CheckRow::new(iso3("CAF"), 2).with("b", 3i64)]);

        assert_eq!(table.len(), 3);
        assert_eq!(table.columns(), &["a", "b"]);
        assert_eq!(table.get(&iso3("CAF"), 0, "a"), &MetricValue::Int(1));
        assert!(table.get(&iso3("CAF"), 0, "b").is_null());
        assert!(table.get(&iso3("CAF"), 2, "a").is_null());
        assert_eq!(table.get(&iso3("CAF"), 2, "b"), &MetricValue::Int(3));
    }

    #[test]
    fn merge_extends_existing_rows_instead_of_duplicating() {
        let mut table = QualityTable::new();
        table.merge_rows(vec![CheckRow::new(iso3("NER"), 0).with("a", 1i64)]);
        table.merge_rows(vec![CheckRow::new(iso3("NER"), 0).with("b", true)]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&iso3("NER"), 0, "a"), &MetricValue::Int(1));
        assert_eq!(table.get(&iso3("NER"), 0, "b"), &MetricValue::Bool(true));
    }

    #[test]
    fn delimited_output_renders_nulls_as_empty_cells() {
        let mut table = QualityTable::new();
        table.merge_rows(vec![
            CheckRow::new(iso3("CAF"), 0)
                .with("count", 2i64)
                .with("note", "a, b"),
            CheckRow::new(iso3("CAF"), 1).with("count", MetricValue::Null),
        ]);
        let text = table.to_delimited();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("iso3,level,count,note"));
        assert_eq!(lines.next(), Some("CAF,0,2,\"a, b\""));
        assert_eq!(lines.next(), Some("CAF,1,,"));
    }

    #[test]
    fn metric_coercion_for_aggregation() {
        assert_eq!(MetricValue::Bool(true).as_f64(), Some(1.0));
        assert_eq!(MetricValue::Bool(false).as_f64(), Some(0.0));
        assert_eq!(MetricValue::Int(4).as_f64(), Some(4.0));
        assert_eq!(MetricValue::Null.as_f64(), None);
        assert_eq!(MetricValue::Text("x".to_string()).as_f64(), None);
    }
}
