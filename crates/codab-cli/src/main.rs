// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use clap::{ArgAction, Parser, Subcommand};
use codab_cli::{LogPublisher, NoCatalog, Pipeline, PipelineOptions, RunLog};
use codab_core::MachineError;
use codab_checks::run_checks;
use codab_fetch::{
    load_levels, polygon_layer_ids, ArcGisClient, CatalogClient, FeatureQuery,
    HttpCatalogClient, StaticToken,
};
use codab_model::{Iso3, QualityConfig, QualityTable};
use codab_scores::{
    aggregate, country_checks_path, country_scores_path, ranked_scores_path, score,
    write_country_table, write_ranked_scores,
};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode as ProcessExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "codab")]
#[command(about = "Administrative boundary quality pipeline")]
struct Cli {
    /// Machine-readable JSON output.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[arg(long, global = true, default_value_t = false)]
    quiet: bool,
    #[arg(long, global = true, action = ArgAction::Count)]
    verbose: u8,
    /// Rubric configuration TOML; defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stage boundary layers for the given countries.
    Download {
        #[arg(long)]
        service_url: String,
        #[arg(long)]
        staging_dir: PathBuf,
        #[arg(long, default_value = "")]
        token: String,
        countries: Vec<String>,
    },
    /// Run diagnostics over already-staged layers.
    Check {
        #[arg(long)]
        staging_dir: PathBuf,
        #[arg(long)]
        tables_dir: PathBuf,
        countries: Vec<String>,
    },
    /// Run diagnostics and scoring over already-staged layers.
    Score {
        #[arg(long)]
        staging_dir: PathBuf,
        #[arg(long)]
        tables_dir: PathBuf,
        countries: Vec<String>,
    },
    /// Full pipeline: probe, download, check, score, publish gate.
    Run {
        #[arg(long)]
        service_url: String,
        /// Public catalog endpoint for the freshness probe; without
        /// it every country re-runs.
        #[arg(long)]
        catalog_url: Option<String>,
        #[arg(long)]
        staging_dir: PathBuf,
        #[arg(long)]
        tables_dir: PathBuf,
        #[arg(long, default_value = "")]
        token: String,
        /// Re-run countries even when the catalog copy is current.
        #[arg(long, default_value_t = false)]
        force: bool,
        countries: Vec<String>,
    },
    /// Countries the feature service advertises boundary layers for.
    ListCountries {
        #[arg(long)]
        service_url: String,
        #[arg(long, default_value = "")]
        token: String,
    },
}

fn main() -> ProcessExitCode {
    let cli = Cli::parse();
    let as_json = cli.json;
    init_tracing(cli.quiet, cli.verbose);
    match run(cli) {
        Ok(()) => ProcessExitCode::from(codab_core::ExitCode::Success as u8),
        Err(err) => {
            if as_json {
                let envelope =
                    MachineError::new(codab_core::ExitCode::Internal.as_str(), &err);
                match serde_json::to_string(&envelope) {
                    Ok(body) => eprintln!("{body}"),
                    Err(_) => eprintln!("{envelope}"),
                }
            } else {
                eprintln!("{err}");
            }
            ProcessExitCode::from(codab_core::ExitCode::Internal as u8)
        }
    }
}

fn init_tracing(quiet: bool, verbose: u8) {
    let default = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_countries(raw: &[String]) -> Result<Vec<Iso3>, String> {
    if raw.is_empty() {
        return Err("at least one ISO3 country code is required".to_string());
    }
    raw.iter()
        .map(|c| Iso3::parse(c).map_err(|e| e.to_string()))
        .collect()
}

fn load_config(path: Option<&PathBuf>) -> Result<QualityConfig, String> {
    match path {
        Some(path) => QualityConfig::load(path).map_err(|e| e.to_string()),
        None => Ok(QualityConfig::default()),
    }
}

fn make_client(token: &str, config: &QualityConfig) -> Result<ArcGisClient, String> {
    ArcGisClient::new(
        Arc::new(StaticToken(token.to_string())),
        config.http_timeout(),
    )
    .map_err(|e| e.to_string())
}

fn run(cli: Cli) -> Result<(), String> {
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Download {
            service_url,
            staging_dir,
            token,
            countries,
        } => {
            let countries = parse_countries(&countries)?;
            let client = make_client(&token, &config)?;
            let pipeline = Pipeline {
                client: &client,
                catalog: &NoCatalog,
                publisher: &LogPublisher,
                config: &config,
            };
            let options = PipelineOptions {
                service_url: &service_url,
                staging_dir: &staging_dir,
                tables_dir: &staging_dir,
                skip_current: false,
            };
            let mut log = RunLog::default();
            for iso3 in &countries {
                pipeline
                    .download_country(iso3, &options, &mut log)
                    .map_err(|e| e.to_string())?;
            }
            emit(cli.json, &json!({"staged": countries.len()}), || {
                format!("staged {} countries", countries.len())
            });
            Ok(())
        }
        Commands::Check {
            staging_dir,
            tables_dir,
            countries,
        } => {
            let countries = parse_countries(&countries)?;
            for iso3 in &countries {
                let levels =
                    load_levels(&staging_dir, iso3, &config).map_err(|e| e.to_string())?;
                let diagnostics = run_checks(iso3, &levels, &config);
                let path = country_checks_path(&tables_dir, iso3);
                write_country_table(&path, &diagnostics).map_err(|e| e.to_string())?;
                emit(
                    cli.json,
                    &json!({
                        "iso3": iso3,
                        "levels": levels.len(),
                        "artifact": path.display().to_string(),
                    }),
                    || format!("{iso3}: {} levels checked", levels.len()),
                );
            }
            Ok(())
        }
        Commands::Score {
            staging_dir,
            tables_dir,
            countries,
        } => {
            let countries = parse_countries(&countries)?;
            let mut merged = QualityTable::new();
            for iso3 in &countries {
                let levels =
                    load_levels(&staging_dir, iso3, &config).map_err(|e| e.to_string())?;
                let diagnostics = run_checks(iso3, &levels, &config);
                write_country_table(&country_checks_path(&tables_dir, iso3), &diagnostics)
                    .map_err(|e| e.to_string())?;
                let scores = score(&diagnostics, &config);
                write_country_table(&country_scores_path(&tables_dir, iso3), &scores)
                    .map_err(|e| e.to_string())?;
                merged.merge_table(&scores);
            }
            let ranking = aggregate(&merged).map_err(|e| e.to_string())?;
            write_ranked_scores(&ranked_scores_path(&tables_dir), &ranking)
                .map_err(|e| e.to_string())?;
            for row in &ranking.rows {
                emit(
                    cli.json,
                    &json!({"iso3": row.iso3, "score": row.score, "passes": row.passes()}),
                    || {
                        format!(
                            "{} {} {}",
                            row.iso3,
                            row.score,
                            if row.passes() { "pass" } else { "fail" }
                        )
                    },
                );
            }
            Ok(())
        }
        Commands::Run {
            service_url,
            catalog_url,
            staging_dir,
            tables_dir,
            token,
            force,
            countries,
        } => {
            let countries = parse_countries(&countries)?;
            let client = make_client(&token, &config)?;
            let catalog: Box<dyn CatalogClient> = match &catalog_url {
                Some(url) => Box::new(HttpCatalogClient::new(url).map_err(|e| e.to_string())?),
                None => Box::new(NoCatalog),
            };
            let pipeline = Pipeline {
                client: &client,
                catalog: catalog.as_ref(),
                publisher: &LogPublisher,
                config: &config,
            };
            let options = PipelineOptions {
                service_url: &service_url,
                staging_dir: &staging_dir,
                tables_dir: &tables_dir,
                skip_current: !force,
            };
            let mut log = RunLog::default();
            let batch = pipeline.run_batch(&countries, &options, &mut log);
            for outcome in &batch.outcomes {
                emit(
                    cli.json,
                    &json!(outcome),
                    || match (&outcome.error, outcome.skipped, outcome.score) {
                        (Some(error), _, _) => format!("{} failed: {error}", outcome.iso3),
                        (None, true, _) => format!("{} skipped (catalog current)", outcome.iso3),
                        (None, false, Some(score)) => format!(
                            "{} {} {}",
                            outcome.iso3,
                            score,
                            if outcome.published { "published" } else { "fail" }
                        ),
                        (None, false, None) => format!("{} produced no score", outcome.iso3),
                    },
                );
            }
            if batch.outcomes.iter().all(|o| o.error.is_some()) {
                return Err("every country failed".to_string());
            }
            Ok(())
        }
        Commands::ListCountries { service_url, token } => {
            let client = make_client(&token, &config)?;
            let info = client.service_info(&service_url).map_err(|e| e.to_string())?;
            let mut seen: Vec<Iso3> = Vec::new();
            for (iso3, _, _) in polygon_layer_ids(&info) {
                if !seen.contains(&iso3) {
                    seen.push(iso3);
                }
            }
            for iso3 in &seen {
                emit(cli.json, &json!({"iso3": iso3}), || iso3.to_string());
            }
            Ok(())
        }
    }
}

fn emit(as_json: bool, machine: &serde_json::Value, human: impl FnOnce() -> String) {
    if as_json {
        println!("{machine}");
    } else {
        println!("{}", human());
    }
}
