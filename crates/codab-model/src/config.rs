// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::Iso3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(pub String);

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Default finest admin level fetched and checked (levels 0..=5).
pub const DEFAULT_ADMIN_LEVELS: u8 = 5;

/// Immutable rubric configuration, threaded into the checks and
/// scoring engines at construction. No process-wide state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct QualityConfig {
    /// Global admin-level ceiling.
    pub admin_levels: u8,
    /// Per-country override of the finest level to process.
    pub max_level_overrides: BTreeMap<String, u8>,
    /// Primary language tags whose names are expected in a romanized
    /// script; the languages score requires the primary tag to be in
    /// this set.
    pub romanized_languages: BTreeSet<String>,
    /// Columns that are always acceptable regardless of level.
    pub misc_columns: Vec<String>,
    /// Outer fetch retry attempts.
    pub fetch_attempts: usize,
    /// Fixed wait between outer fetch attempts, seconds.
    pub fetch_wait_secs: u64,
    /// Per-request HTTP timeout, seconds.
    pub http_timeout_secs: u64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            admin_levels: DEFAULT_ADMIN_LEVELS,
            max_level_overrides: BTreeMap::new(),
            romanized_languages: [
                "az", "cs", "da", "de", "en", "es", "et", "fi", "fr", "ha", "hr", "hu", "id",
                "it", "lt", "lv", "ms", "nl", "no", "pl", "pt", "ro", "sk", "sl", "so", "sq",
                "sv", "sw", "tl", "tr", "uz", "vi",
            ]
            .into_iter()
            .map(ToString::to_string)
            .collect(),
            misc_columns: [
                "geometry",
                "objectid",
                "valid_on",
                "valid_to",
                "lang",
                "lang1",
                "lang2",
                "area_sqkm",
            ]
            .into_iter()
            .map(ToString::to_string)
            .collect(),
            fetch_attempts: 3,
            fetch_wait_secs: 10,
            http_timeout_secs: 120,
        }
    }
}

impl QualityConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        toml::from_str(input).map_err(|e| ConfigError(format!("invalid config: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("unreadable config {}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// Finest admin level for a country: the override when present,
    /// else the global ceiling.
    #[must_use]
    pub fn max_level(&self, iso3: &Iso3) -> u8 {
        self.max_level_overrides
            .get(iso3.as_str())
            .copied()
            .unwrap_or(self.admin_levels)
    }

    #[must_use]
    pub fn is_romanized(&self, tag: &str) -> bool {
        let primary = tag.split('-').next().unwrap_or(tag).to_ascii_lowercase();
        self.romanized_languages.contains(&primary)
    }

    #[must_use]
    pub fn fetch_wait(&self) -> Duration {
        Duration::from_secs(self.fetch_wait_secs)
    }

    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = QualityConfig::default();
        assert_eq!(config.admin_levels, 5);
        assert!(config.is_romanized("fr"));
        assert!(config.is_romanized("en-GB"));
        assert!(!config.is_romanized("ar"));
    }

    #[test]
    fn overrides_win_over_global_ceiling() {
        let mut config = QualityConfig::default();
        config.max_level_overrides.insert("CAF".to_string(), 2);
        let caf = Iso3::parse("CAF").expect("iso3");
        let ner = Iso3::parse("NER").expect("iso3");
        assert_eq!(config.max_level(&caf), 2);
        assert_eq!(config.max_level(&ner), 5);
    }

    #[test]
    fn toml_round_trip() {
        let parsed = QualityConfig::from_toml_str(
            r#"
            admin_levels = 4
            fetch_attempts = 5

            [max_level_overrides]
            HTI = 3
            "#,
        )
        .expect("parse");
        assert_eq!(parsed.admin_levels, 4);
        assert_eq!(parsed.fetch_attempts, 5);
        assert_eq!(parsed.max_level_overrides.get("HTI"), Some(&3));
        // Unlisted fields fall back to defaults.
        assert_eq!(parsed.http_timeout_secs, 120);
    }

    #[test]
    fn unknown_keys_are_fatal() {
        assert!(QualityConfig::from_toml_str("no_such_key = 1").is_err());
    }
}
