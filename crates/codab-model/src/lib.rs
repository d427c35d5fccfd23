// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod config;
mod iso3;
mod layer;
mod table;

pub use config::{ConfigError, QualityConfig, DEFAULT_ADMIN_LEVELS};
pub use iso3::Iso3;
pub use layer::{
    name_suffix_index, AttrValue, BoundaryFeature, BoundaryLayer, GeometryKind, LevelSequence,
    SchemaIndex, COL_LANG, COL_VALID_ON, COL_VALID_TO,
};
pub use table::{CheckRow, MetricValue, QualityTable};

pub const CRATE_NAME: &str = "codab-model";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}
