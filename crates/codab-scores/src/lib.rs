// SPDX-License-Identifier: Apache-2.0

//! Reduction of the diagnostics table to one composite score per
//! country. Each score dimension is a boolean predicate over one
//! country-level row; aggregation averages dimensions per country and
//! rounds to three decimals. A composite of exactly 1.0 is the
//! publish gate.

#![forbid(unsafe_code)]

mod output;
mod rules;

use codab_model::{Iso3, QualityConfig, QualityTable};
use std::fmt::{Display, Formatter};

pub use output::{
    country_checks_path, country_scores_path, ranked_scores_path, write_country_table,
    write_ranked_scores,
};
pub use rules::SCORES;

pub const CRATE_NAME: &str = "codab-scores";

/// No score can be produced: the diagnostics table had no rows at all
/// for the requested countries. Treated as a failed run, never a
/// panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationError(pub String);

impl Display for AggregationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for AggregationError {}

pub type ScoreFn = fn(&QualityTable, &QualityConfig) -> Vec<codab_model::CheckRow>;

pub struct ScoreDef {
    pub name: &'static str,
    pub run: ScoreFn,
}

/// Apply every registered score dimension and outer-join the rows on
/// (country, level).
#[must_use]
pub fn score(diagnostics: &QualityTable, config: &QualityConfig) -> QualityTable {
    let mut table = QualityTable::new();
    for dimension in SCORES {
        table.merge_rows((dimension.run)(diagnostics, config));
    }
    table
}

/// One country's aggregated result: per-dimension means aligned with
/// the score table's column order, plus the composite.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryScore {
    pub iso3: Iso3,
    pub dimensions: Vec<Option<f64>>,
    pub score: f64,
}

impl CountryScore {
    #[must_use]
    pub fn passes(&self) -> bool {
        self.score == 1.0
    }
}

/// Ranked aggregation output, worst country first.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub columns: Vec<String>,
    pub rows: Vec<CountryScore>,
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Drop the level key, average each dimension per country with
/// booleans coerced to {0, 1} and ratios clamped into [0, 1], then
/// average across dimensions. Rounded to three decimals and ranked
/// ascending by (score, country) so the worst countries surface
/// first.
pub fn aggregate(scores: &QualityTable) -> Result<Ranking, AggregationError> {
    if scores.is_empty() {
        return Err(AggregationError(
            "no score rows were produced for any country".to_string(),
        ));
    }
    let columns = scores.columns().to_vec();
    let mut rows = Vec::new();
    for iso3 in scores.countries() {
        let levels = scores.levels_for(&iso3);
        let mut dimensions = Vec::with_capacity(columns.len());
        for column in &columns {
            let values: Vec<f64> = levels
                .iter()
                .filter_map(|level| scores.get(&iso3, *level, column).as_f64())
                .map(|v| v.clamp(0.0, 1.0))
                .collect();
            if values.is_empty() {
                dimensions.push(None);
            } else {
                dimensions.push(Some(values.iter().sum::<f64>() / values.len() as f64));
            }
        }
        let present: Vec<f64> = dimensions.iter().flatten().copied().collect();
        if present.is_empty() {
            return Err(AggregationError(format!(
                "no numeric score dimensions for {iso3}"
            )));
        }
        // The composite averages the full-precision means; rounding
        // happens once here and once per dimension for display.
        let score = round3(present.iter().sum::<f64>() / present.len() as f64);
        rows.push(CountryScore {
            iso3,
            dimensions: dimensions.into_iter().map(|d| d.map(round3)).collect(),
            score,
        });
    }
    rows.sort_by(|a, b| {
        a.score
            .total_cmp(&b.score)
            .then_with(|| a.iso3.cmp(&b.iso3))
    });
    Ok(Ranking { columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use codab_model::CheckRow;

    fn iso3(code: &str) -> Iso3 {
        Iso3::parse(code).expect("iso3")
    }

    fn score_table(rows: Vec<CheckRow>) -> QualityTable {
        let mut table = QualityTable::new();
        table.merge_rows(rows);
        table
    }

    #[test]
    fn empty_table_is_an_error_not_a_panic() {
        assert!(aggregate(&QualityTable::new()).is_err());
    }

    #[test]
    fn aggregation_averages_levels_then_dimensions() {
        let table = score_table(vec![
            CheckRow::new(iso3("CAF"), 0).with("a", true).with("b", true),
            CheckRow::new(iso3("CAF"), 1).with("a", false).with("b", true),
        ]);
        let ranking = aggregate(&table).expect("aggregate");
        assert_eq!(ranking.rows.len(), 1);
        let caf = &ranking.rows[0];
        assert_eq!(caf.dimensions, vec![Some(0.5), Some(1.0)]);
        assert_eq!(caf.score, 0.75);
        assert!(!caf.passes());
    }

    #[test]
    fn ranking_is_worst_first_with_iso3_tiebreak() {
        let table = score_table(vec![
            CheckRow::new(iso3("NER"), 0).with("a", true),
            CheckRow::new(iso3("CAF"), 0).with("a", false),
            CheckRow::new(iso3("AGO"), 0).with("a", false),
        ]);
        let ranking = aggregate(&table).expect("aggregate");
        let order: Vec<&str> = ranking.rows.iter().map(|r| r.iso3.as_str()).collect();
        assert_eq!(order, vec!["AGO", "CAF", "NER"]);
    }

    #[test]
    fn aggregation_is_idempotent_at_three_decimals() {
        let table = score_table(vec![
            CheckRow::new(iso3("MDG"), 0).with("a", true),
            CheckRow::new(iso3("MDG"), 1).with("a", true),
            CheckRow::new(iso3("MDG"), 2).with("a", false),
        ]);
        let first = aggregate(&table).expect("first");
        let second = aggregate(&table).expect("second");
        assert_eq!(first, second);
        assert_eq!(first.rows[0].score, 0.667);
    }

    #[test]
    fn composite_rounds_once_not_per_dimension() {
        let table = score_table(vec![CheckRow::new(iso3("TCD"), 0)
            .with("a", 0.1666)
            .with("b", 0.1663)]);
        let ranking = aggregate(&table).expect("aggregate");
        let row = &ranking.rows[0];
        // Displayed dimensions are rounded, but the composite comes
        // from the full-precision means: (0.1666 + 0.1663) / 2 lands
        // below 0.1665 while the rounded pair would average to it.
        assert_eq!(row.dimensions, vec![Some(0.167), Some(0.166)]);
        assert_eq!(row.score, 0.166);
    }

    #[test]
    fn null_dimensions_are_skipped_not_zeroed() {
        let table = score_table(vec![
            CheckRow::new(iso3("HTI"), 0)
                .with("a", true)
                .with("b", codab_model::MetricValue::Null),
        ]);
        let ranking = aggregate(&table).expect("aggregate");
        assert_eq!(ranking.rows[0].dimensions, vec![Some(1.0), None]);
        assert_eq!(ranking.rows[0].score, 1.0);
        assert!(ranking.rows[0].passes());
    }
}
