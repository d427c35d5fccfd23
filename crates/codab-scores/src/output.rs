// SPDX-License-Identifier: Apache-2.0

//! Persisted artifacts: per-country checks and scores tables plus the
//! ranked summary. Written regardless of pass/fail so failures are
//! always inspectable.

use codab_model::{Iso3, QualityTable};
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::Ranking;

#[must_use]
pub fn country_checks_path(tables_dir: &Path, iso3: &Iso3) -> PathBuf {
    tables_dir.join("checks").join(format!("{}.csv", iso3.lower()))
}

#[must_use]
pub fn country_scores_path(tables_dir: &Path, iso3: &Iso3) -> PathBuf {
    tables_dir.join("scores").join(format!("{}.csv", iso3.lower()))
}

#[must_use]
pub fn ranked_scores_path(tables_dir: &Path) -> PathBuf {
    tables_dir.join("scores.csv")
}

pub fn write_country_table(path: &Path, table: &QualityTable) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    table.write_delimited(path)?;
    tracing::debug!(path = %path.display(), rows = table.len(), "wrote table artifact");
    Ok(())
}

pub fn write_ranked_scores(path: &Path, ranking: &Ranking) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = String::from("iso3");
    for column in &ranking.columns {
        out.push(',');
        out.push_str(column);
    }
    out.push_str(",score\n");
    for row in &ranking.rows {
        out.push_str(row.iso3.as_str());
        for dimension in &row.dimensions {
            out.push(',');
            if let Some(value) = dimension {
                let _ = write!(out, "{value}");
            }
        }
        let _ = writeln!(out, ",{}", row.score);
    }
    fs::write(path, out)?;
    tracing::debug!(
        path = %path.display(),
        countries = ranking.rows.len(),
        "wrote ranked scores"
    );
    Ok(())
}
