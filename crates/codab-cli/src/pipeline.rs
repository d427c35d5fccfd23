// SPDX-License-Identifier: Apache-2.0

//! Per-country pipeline: probe, download, checks, scores, publish
//! gate. A country that fails is logged and skipped; a batch always
//! completes.

use codab_core::RetryPolicy;
use codab_fetch::{
    fetch_layer, line_layer_ids, load_levels, point_layer_ids, polygon_layer_ids,
    polygon_layer_path, lines_layer_path, points_layer_path, service_last_updated,
    CatalogClient, FeatureQuery,
};
use codab_model::{GeometryKind, Iso3, QualityConfig, QualityTable};
use codab_scores::{
    aggregate, country_checks_path, country_scores_path, ranked_scores_path, score,
    write_country_table, write_ranked_scores, Ranking,
};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::Path;

use crate::{RunLog, RunStage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineError(pub String);

impl Display for PipelineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for PipelineError {}

/// Downstream publication port, invoked only when a country clears
/// the composite gate. Catalog upload itself lives behind this seam.
pub trait Publisher {
    fn publish(
        &self,
        iso3: &Iso3,
        scores: &QualityTable,
        diagnostics: &QualityTable,
    ) -> Result<(), PipelineError>;
}

/// Default implementation: announce eligibility and do nothing else.
pub struct LogPublisher;

impl Publisher for LogPublisher {
    fn publish(
        &self,
        iso3: &Iso3,
        _scores: &QualityTable,
        _diagnostics: &QualityTable,
    ) -> Result<(), PipelineError> {
        tracing::info!(iso3 = iso3.as_str(), "eligible to publish");
        Ok(())
    }
}

/// Catalog stand-in when no catalog endpoint is configured: nothing
/// is ever considered current, so every country re-runs.
pub struct NoCatalog;

impl CatalogClient for NoCatalog {
    fn last_modified(
        &self,
        _iso3: &Iso3,
    ) -> Result<Option<chrono::DateTime<chrono::Utc>>, codab_fetch::FetchError> {
        Ok(None)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions<'a> {
    pub service_url: &'a str,
    pub staging_dir: &'a Path,
    pub tables_dir: &'a Path,
    /// Skip countries whose catalog copy is at least as fresh as the
    /// remote service.
    pub skip_current: bool,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct CountryOutcome {
    pub iso3: Iso3,
    pub skipped: bool,
    pub score: Option<f64>,
    pub published: bool,
    pub error: Option<String>,
}

impl CountryOutcome {
    fn new(iso3: &Iso3) -> Self {
        Self {
            iso3: iso3.clone(),
            skipped: false,
            score: None,
            published: false,
            error: None,
        }
    }

    fn failed(iso3: &Iso3, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(iso3)
        }
    }
}

#[derive(Debug)]
pub struct BatchResult {
    pub outcomes: Vec<CountryOutcome>,
    pub ranking: Option<Ranking>,
}

pub struct Pipeline<'a> {
    pub client: &'a dyn FeatureQuery,
    pub catalog: &'a dyn CatalogClient,
    pub publisher: &'a dyn Publisher,
    pub config: &'a QualityConfig,
}

impl Pipeline<'_> {
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.config.fetch_attempts,
            wait: self.config.fetch_wait(),
        }
    }

    /// Run the whole pipeline for one country. Never panics and never
    /// propagates: any failure lands in the outcome's `error`.
    pub fn run_country(
        &self,
        iso3: &Iso3,
        options: &PipelineOptions<'_>,
        log: &mut RunLog,
    ) -> CountryOutcome {
        self.run_country_with_scores(iso3, options, log).0
    }

    fn run_country_with_scores(
        &self,
        iso3: &Iso3,
        options: &PipelineOptions<'_>,
        log: &mut RunLog,
    ) -> (CountryOutcome, Option<QualityTable>) {
        let info = match self.client.service_info(options.service_url) {
            Ok(info) => info,
            Err(error) => {
                tracing::error!(iso3 = iso3.as_str(), error = %error, "service probe failed");
                return (CountryOutcome::failed(iso3, error.to_string()), None);
            }
        };

        if options.skip_current {
            let service = service_last_updated(&info);
            let catalog = self.catalog.last_modified(iso3).unwrap_or(None);
            if let (Some(service), Some(catalog)) = (service, catalog) {
                if catalog >= service {
                    log.emit(
                        RunStage::Probe,
                        "catalog_current",
                        BTreeMap::from([(
                            "catalog_modified".to_string(),
                            catalog.to_rfc3339(),
                        )]),
                    );
                    tracing::info!(iso3 = iso3.as_str(), "catalog copy is current, skipping");
                    let mut outcome = CountryOutcome::new(iso3);
                    outcome.skipped = true;
                    return (outcome, None);
                }
            }
        }

        if let Err(error) = self.download(iso3, &info, options, log) {
            tracing::error!(iso3 = iso3.as_str(), error = %error, "download failed");
            return (CountryOutcome::failed(iso3, error.to_string()), None);
        }

        match self.check_and_score(iso3, options, log) {
            Ok((outcome, scores)) => (outcome, Some(scores)),
            Err(error) => {
                tracing::error!(iso3 = iso3.as_str(), error = %error, "scoring failed");
                (CountryOutcome::failed(iso3, error.0), None)
            }
        }
    }

    /// Stage a country's layers without checking or scoring them.
    pub fn download_country(
        &self,
        iso3: &Iso3,
        options: &PipelineOptions<'_>,
        log: &mut RunLog,
    ) -> Result<(), PipelineError> {
        let info = self
            .client
            .service_info(options.service_url)
            .map_err(|e| PipelineError(e.to_string()))?;
        self.download(iso3, &info, options, log)
    }

    fn download(
        &self,
        iso3: &Iso3,
        info: &serde_json::Value,
        options: &PipelineOptions<'_>,
        log: &mut RunLog,
    ) -> Result<(), PipelineError> {
        let retry = self.retry_policy();
        let max_level = self.config.max_level(iso3);
        let polygons: Vec<(u8, u64)> = polygon_layer_ids(info)
            .into_iter()
            .filter(|(layer_iso3, level, _)| layer_iso3 == iso3 && *level <= max_level)
            .map(|(_, level, id)| (level, id))
            .collect();
        if polygons.is_empty() {
            return Err(PipelineError(format!(
                "no boundary layers for {iso3} at {}",
                options.service_url
            )));
        }
        for (level, id) in polygons {
            let destination = polygon_layer_path(options.staging_dir, iso3, level);
            let report = fetch_layer(
                self.client,
                &format!("{}/{id}", options.service_url),
                GeometryKind::Polygon,
                &destination,
                &retry,
            )
            .map_err(|e| PipelineError(e.to_string()))?;
            log.emit(
                RunStage::Download,
                "layer_staged",
                BTreeMap::from([
                    ("level".to_string(), level.to_string()),
                    ("features".to_string(), report.feature_count.to_string()),
                    ("sha256".to_string(), report.sha256),
                ]),
            );
        }
        for (layer_iso3, id) in line_layer_ids(info) {
            if layer_iso3 == *iso3 {
                let destination = lines_layer_path(options.staging_dir, iso3);
                fetch_layer(
                    self.client,
                    &format!("{}/{id}", options.service_url),
                    GeometryKind::Line,
                    &destination,
                    &retry,
                )
                .map_err(|e| PipelineError(e.to_string()))?;
            }
        }
        for (layer_iso3, id) in point_layer_ids(info) {
            if layer_iso3 == *iso3 {
                let destination = points_layer_path(options.staging_dir, iso3);
                fetch_layer(
                    self.client,
                    &format!("{}/{id}", options.service_url),
                    GeometryKind::Point,
                    &destination,
                    &retry,
                )
                .map_err(|e| PipelineError(e.to_string()))?;
            }
        }
        Ok(())
    }

    fn check_and_score(
        &self,
        iso3: &Iso3,
        options: &PipelineOptions<'_>,
        log: &mut RunLog,
    ) -> Result<(CountryOutcome, QualityTable), PipelineError> {
        let levels = load_levels(options.staging_dir, iso3, self.config)
            .map_err(|e| PipelineError(e.to_string()))?;
        let diagnostics = codab_checks::run_checks(iso3, &levels, self.config);
        write_country_table(&country_checks_path(options.tables_dir, iso3), &diagnostics)
            .map_err(|e| PipelineError(e.to_string()))?;
        log.emit(
            RunStage::Checks,
            "diagnostics_written",
            BTreeMap::from([("levels".to_string(), levels.len().to_string())]),
        );

        let scores = score(&diagnostics, self.config);
        write_country_table(&country_scores_path(options.tables_dir, iso3), &scores)
            .map_err(|e| PipelineError(e.to_string()))?;

        let ranking = aggregate(&scores).map_err(|e| PipelineError(e.to_string()))?;
        let composite = ranking
            .rows
            .first()
            .ok_or_else(|| PipelineError(format!("no composite score for {iso3}")))?;
        log.emit(
            RunStage::Scores,
            "composite",
            BTreeMap::from([("score".to_string(), composite.score.to_string())]),
        );

        let mut outcome = CountryOutcome::new(iso3);
        outcome.score = Some(composite.score);
        if composite.passes() {
            self.publisher.publish(iso3, &scores, &diagnostics)?;
            log.emit(RunStage::Publish, "published", BTreeMap::new());
            outcome.published = true;
        } else {
            tracing::info!(
                iso3 = iso3.as_str(),
                score = composite.score,
                "below publish gate"
            );
        }
        Ok((outcome, scores))
    }

    /// Run every requested country, then write the ranked summary
    /// over all scored countries. One country's failure never aborts
    /// the rest.
    pub fn run_batch(
        &self,
        countries: &[Iso3],
        options: &PipelineOptions<'_>,
        log: &mut RunLog,
    ) -> BatchResult {
        let mut outcomes = Vec::new();
        let mut merged = QualityTable::new();
        for iso3 in countries {
            let (outcome, scores) = self.run_country_with_scores(iso3, options, log);
            if let Some(scores) = scores {
                merged.merge_table(&scores);
            }
            outcomes.push(outcome);
        }
        let ranking = aggregate(&merged).ok();
        if let Some(ranking) = &ranking {
            let path = ranked_scores_path(options.tables_dir);
            if let Err(error) = write_ranked_scores(&path, ranking) {
                tracing::error!(error = %error, "could not write ranked scores");
            }
        }
        BatchResult { outcomes, ranking }
    }
}
