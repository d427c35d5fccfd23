// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod client;
mod esri;
mod fetch;
mod metadata;
mod staging;

use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub use client::{ArcGisClient, FeatureQuery, PortalTokenProvider, QueryParams, StaticToken,
    TokenProvider};
pub use esri::{decode_layer, payload_error, payload_exceeded_limit};
pub use fetch::{fetch_layer, FetchReport, PAGE_SIZES};
pub use metadata::{
    line_layer_ids, point_layer_ids, polygon_layer_ids, service_last_updated, CatalogClient,
    HttpCatalogClient,
};
pub use staging::{
    lines_layer_path, load_levels, points_layer_path, polygon_layer_path,
};

pub const CRATE_NAME: &str = "codab-fetch";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum FetchErrorCode {
    Transport,
    ServiceError,
    WrongGeometryKind,
    Exhausted,
    Token,
    Io,
    Decode,
}

impl FetchErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "transport_error",
            Self::ServiceError => "service_error",
            Self::WrongGeometryKind => "wrong_geometry_kind",
            Self::Exhausted => "retries_exhausted",
            Self::Token => "token_error",
            Self::Io => "io_error",
            Self::Decode => "decode_error",
        }
    }
}

/// Terminal download failure for one layer. The destination is always
/// named so a failed country run is inspectable from the log alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub code: FetchErrorCode,
    pub destination: Option<PathBuf>,
    pub message: String,
}

impl FetchError {
    #[must_use]
    pub fn new(code: FetchErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            destination: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn for_destination(mut self, destination: &std::path::Path) -> Self {
        self.destination = Some(destination.to_path_buf());
        self
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.destination {
            Some(dest) => write!(
                f,
                "{}: {} (destination: {})",
                self.code.as_str(),
                self.message,
                dest.display()
            ),
            None => write!(f, "{}: {}", self.code.as_str(), self.message),
        }
    }
}

impl std::error::Error for FetchError {}
