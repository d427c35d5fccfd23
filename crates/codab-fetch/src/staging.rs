// SPDX-License-Identifier: Apache-2.0

//! Staging-directory layout and reload of downloaded layers.
//!
//! One JSON file per layer, named after the remote layer identity, so
//! a staging directory is self-describing and a re-run overwrites in
//! place instead of accumulating stale copies.

use codab_model::{BoundaryLayer, Iso3, LevelSequence, QualityConfig};
use std::fs;
use std::path::{Path, PathBuf};

use crate::{FetchError, FetchErrorCode};

#[must_use]
pub fn polygon_layer_path(dir: &Path, iso3: &Iso3, level: u8) -> PathBuf {
    dir.join(format!("{}_admin{level}.json", iso3.lower()))
}

#[must_use]
pub fn lines_layer_path(dir: &Path, iso3: &Iso3) -> PathBuf {
    dir.join(format!("{}_adminlines.json", iso3.lower()))
}

#[must_use]
pub fn points_layer_path(dir: &Path, iso3: &Iso3) -> PathBuf {
    dir.join(format!("{}_admincentroids.json", iso3.lower()))
}

/// Load the contiguous run of polygon levels staged for one country,
/// starting at level 0 and stopping at the first absent file. The
/// resulting index is the admin level.
pub fn load_levels(
    dir: &Path,
    iso3: &Iso3,
    config: &QualityConfig,
) -> Result<LevelSequence, FetchError> {
    let mut levels = Vec::new();
    for level in 0..=config.max_level(iso3) {
        let path = polygon_layer_path(dir, iso3, level);
        if !path.exists() {
            break;
        }
        levels.push(load_layer(&path)?);
    }
    Ok(levels)
}

fn load_layer(path: &Path) -> Result<BoundaryLayer, FetchError> {
    let bytes = fs::read(path)
        .map_err(|e| FetchError::new(FetchErrorCode::Io, e.to_string()).for_destination(path))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| FetchError::new(FetchErrorCode::Decode, e.to_string()).for_destination(path))
}
