// SPDX-License-Identifier: Apache-2.0

use codab_core::{sha256_hex, BackoffPolicy, RetryPolicy};
use codab_model::{BoundaryLayer, GeometryKind};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::client::{FeatureQuery, QueryParams};
use crate::esri::{decode_layer, payload_error, payload_exceeded_limit};
use crate::{FetchError, FetchErrorCode};

/// Degradation ladder. `None` asks the server for everything in one
/// response; each later entry trades request count for smaller result
/// sets the server can actually materialize.
pub const PAGE_SIZES: &[Option<u32>] = &[None, Some(1000), Some(100), Some(10), Some(1)];

/// Outcome of one successful layer download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    pub destination: PathBuf,
    pub feature_count: usize,
    pub sha256: String,
    /// Page size that finally worked.
    pub page_size: Option<u32>,
}

/// Download one layer to `destination`, overwriting any previous file.
///
/// Two nested recovery loops: the inner loop walks [`PAGE_SIZES`] so a
/// server failing on large result sets still yields a complete layer,
/// and the outer loop retries the whole ladder on a fixed interval.
/// A layer that comes back empty or whose geometry kind disagrees with
/// `expected` is treated as a failed attempt; the server intermittently
/// serves empty results or records with their geometry stripped.
pub fn fetch_layer(
    client: &dyn FeatureQuery,
    layer_url: &str,
    expected: GeometryKind,
    destination: &Path,
    retry: &RetryPolicy,
) -> Result<FetchReport, FetchError> {
    let mut last_error = FetchError::new(FetchErrorCode::Exhausted, "no attempts made");
    for attempt in 1..=retry.max_attempts {
        match attempt_download(client, layer_url, expected) {
            Ok((layer, page_size)) => {
                return write_layer(&layer, destination, page_size);
            }
            Err(error) => {
                tracing::warn!(
                    layer_url,
                    attempt,
                    max_attempts = retry.max_attempts,
                    error = %error,
                    "layer download attempt failed"
                );
                last_error = error;
            }
        }
        if attempt < retry.max_attempts {
            std::thread::sleep(retry.delay_for_attempt(attempt));
        }
    }
    Err(FetchError::new(
        FetchErrorCode::Exhausted,
        format!(
            "gave up after {} attempts, last error: {last_error}",
            retry.max_attempts
        ),
    )
    .for_destination(destination))
}

/// One pass down the page-size ladder.
fn attempt_download(
    client: &dyn FeatureQuery,
    layer_url: &str,
    expected: GeometryKind,
) -> Result<(BoundaryLayer, Option<u32>), FetchError> {
    let mut last_error = FetchError::new(FetchErrorCode::ServiceError, "empty page-size ladder");
    for &page_size in PAGE_SIZES {
        match fetch_pages(client, layer_url, page_size) {
            Ok(pages) => {
                let layer = decode_layer(&pages)?;
                if layer.features.is_empty() {
                    // An empty layer never pages into a full one.
                    return Err(FetchError::new(
                        FetchErrorCode::ServiceError,
                        format!("no features returned from {layer_url}"),
                    ));
                }
                if layer.geometry_kind() != Some(expected) {
                    // Not a paging problem; smaller pages won't fix it.
                    return Err(FetchError::new(
                        FetchErrorCode::WrongGeometryKind,
                        format!(
                            "expected {} geometry from {layer_url}",
                            expected.as_str()
                        ),
                    ));
                }
                return Ok((layer, page_size));
            }
            Err(error) => {
                tracing::debug!(
                    layer_url,
                    page_size = ?page_size,
                    error = %error,
                    "page size failed, degrading"
                );
                last_error = error;
            }
        }
    }
    Err(last_error)
}

fn fetch_pages(
    client: &dyn FeatureQuery,
    layer_url: &str,
    page_size: Option<u32>,
) -> Result<Vec<Value>, FetchError> {
    let Some(size) = page_size else {
        let payload = client.query(layer_url, &QueryParams::default())?;
        check_payload(&payload)?;
        if payload_exceeded_limit(&payload) {
            return Err(FetchError::new(
                FetchErrorCode::ServiceError,
                "server truncated an unpaginated result",
            ));
        }
        return Ok(vec![payload]);
    };

    let mut pages = Vec::new();
    let mut offset = 0u64;
    loop {
        let params = QueryParams {
            result_record_count: Some(size),
            result_offset: Some(offset),
        };
        let payload = client.query(layer_url, &params)?;
        check_payload(&payload)?;
        let count = page_feature_count(&payload)?;
        let truncated = payload_exceeded_limit(&payload);
        pages.push(payload);
        if count < size as usize || !truncated {
            return Ok(pages);
        }
        offset += u64::from(size);
    }
}

fn check_payload(payload: &Value) -> Result<(), FetchError> {
    match payload_error(payload) {
        Some(message) => Err(FetchError::new(FetchErrorCode::ServiceError, message)),
        None => Ok(()),
    }
}

fn page_feature_count(payload: &Value) -> Result<usize, FetchError> {
    payload
        .get("features")
        .and_then(Value::as_array)
        .map(Vec::len)
        .ok_or_else(|| FetchError::new(FetchErrorCode::Decode, "payload has no features"))
}

fn write_layer(
    layer: &BoundaryLayer,
    destination: &Path,
    page_size: Option<u32>,
) -> Result<FetchReport, FetchError> {
    let bytes = serde_json::to_vec(layer)
        .map_err(|e| {
            FetchError::new(FetchErrorCode::Decode, e.to_string()).for_destination(destination)
        })?;
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            FetchError::new(FetchErrorCode::Io, e.to_string()).for_destination(destination)
        })?;
    }
    fs::write(destination, &bytes).map_err(|e| {
        FetchError::new(FetchErrorCode::Io, e.to_string()).for_destination(destination)
    })?;
    Ok(FetchReport {
        destination: destination.to_path_buf(),
        feature_count: layer.features.len(),
        sha256: sha256_hex(&bytes),
        page_size,
    })
}
