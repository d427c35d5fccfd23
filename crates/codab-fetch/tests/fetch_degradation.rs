// SPDX-License-Identifier: Apache-2.0

use codab_core::RetryPolicy;
use codab_fetch::{fetch_layer, FeatureQuery, FetchError, FetchErrorCode, QueryParams};
use codab_model::GeometryKind;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::time::Duration;

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        wait: Duration::from_millis(0),
    }
}

fn polygon_feature(id: i64) -> Value {
    json!({
        "attributes": {"objectid": id, "adm0_pcode": "CAF"},
        "geometry": {"rings": [[[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]]]}
    })
}

fn point_feature(id: i64) -> Value {
    json!({
        "attributes": {"objectid": id, "adm0_pcode": "CAF"},
        "geometry": {"x": 0.5, "y": 0.5}
    })
}

/// Serves 150 polygon features, but fails with a server-side error
/// for any page size above 100, the way an overloaded server does.
struct OverloadedService {
    total: usize,
    requests: RefCell<Vec<Option<u32>>>,
}

impl OverloadedService {
    fn new(total: usize) -> Self {
        Self {
            total,
            requests: RefCell::new(Vec::new()),
        }
    }
}

impl FeatureQuery for OverloadedService {
    fn query(&self, _layer_url: &str, params: &QueryParams) -> Result<Value, FetchError> {
        self.requests.borrow_mut().push(params.result_record_count);
        let size = match params.result_record_count {
            None => {
                return Ok(json!({"error": {"code": 500, "message": "out of memory"}}));
            }
            Some(size) if size > 100 => {
                return Err(FetchError::new(
                    FetchErrorCode::ServiceError,
                    "query timed out",
                ));
            }
            Some(size) => size as usize,
        };
        let offset = params.result_offset.unwrap_or(0) as usize;
        let end = (offset + size).min(self.total);
        let features: Vec<Value> = (offset..end).map(|i| polygon_feature(i as i64)).collect();
        Ok(json!({
            "fields": [{"name": "objectid"}, {"name": "adm0_pcode"}],
            "features": features,
            "exceededTransferLimit": end < self.total
        }))
    }

    fn service_info(&self, _service_url: &str) -> Result<Value, FetchError> {
        Ok(json!({}))
    }
}

#[test]
fn degrades_page_size_without_spending_retry_budget() {
    let service = OverloadedService::new(150);
    let dir = tempfile::tempdir().expect("tempdir");
    let destination = dir.path().join("caf_admin0.json");

    let report = fetch_layer(
        &service,
        "https://server.example/rest/services/caf/FeatureServer/0",
        GeometryKind::Polygon,
        &destination,
        &fast_retry(),
    )
    .expect("download succeeds at a smaller page size");

    assert_eq!(report.feature_count, 150);
    assert_eq!(report.page_size, Some(100));
    assert!(destination.exists());

    // One pass down the ladder: full, 1000, then two pages of 100.
    // No second outer attempt was needed.
    let requests = service.requests.borrow();
    assert_eq!(*requests, vec![None, Some(1000), Some(100), Some(100)]);
}

/// Alternates between serving geometry-stripped records and real
/// polygons, which the fetcher must treat as a retryable failure.
struct FlakyGeometryService {
    attempts: RefCell<usize>,
}

impl FeatureQuery for FlakyGeometryService {
    fn query(&self, _layer_url: &str, params: &QueryParams) -> Result<Value, FetchError> {
        if params.result_record_count.is_some() {
            return Err(FetchError::new(
                FetchErrorCode::ServiceError,
                "pagination unsupported",
            ));
        }
        let mut attempts = self.attempts.borrow_mut();
        *attempts += 1;
        let feature = if *attempts == 1 {
            point_feature(1)
        } else {
            polygon_feature(1)
        };
        Ok(json!({"features": [feature]}))
    }

    fn service_info(&self, _service_url: &str) -> Result<Value, FetchError> {
        Ok(json!({}))
    }
}

#[test]
fn wrong_geometry_kind_is_retried_until_the_server_recovers() {
    let service = FlakyGeometryService {
        attempts: RefCell::new(0),
    };
    let dir = tempfile::tempdir().expect("tempdir");
    let destination = dir.path().join("caf_admin0.json");

    let report = fetch_layer(
        &service,
        "https://server.example/rest/services/caf/FeatureServer/0",
        GeometryKind::Polygon,
        &destination,
        &fast_retry(),
    )
    .expect("second attempt serves real polygons");

    assert_eq!(report.feature_count, 1);
    assert_eq!(*service.attempts.borrow(), 2);
}

/// Answers every query with a well-formed but featureless payload.
struct EmptyService {
    requests: RefCell<usize>,
}

impl FeatureQuery for EmptyService {
    fn query(&self, _layer_url: &str, _params: &QueryParams) -> Result<Value, FetchError> {
        *self.requests.borrow_mut() += 1;
        Ok(json!({
            "fields": [{"name": "objectid"}, {"name": "adm0_pcode"}],
            "features": []
        }))
    }

    fn service_info(&self, _service_url: &str) -> Result<Value, FetchError> {
        Ok(json!({}))
    }
}

#[test]
fn an_empty_layer_is_a_failed_attempt_not_a_success() {
    let service = EmptyService {
        requests: RefCell::new(0),
    };
    let dir = tempfile::tempdir().expect("tempdir");
    let destination = dir.path().join("caf_admin0.json");

    let error = fetch_layer(
        &service,
        "https://server.example/rest/services/caf/FeatureServer/0",
        GeometryKind::Polygon,
        &destination,
        &fast_retry(),
    )
    .expect_err("nothing was staged");

    assert_eq!(error.code, FetchErrorCode::Exhausted);
    assert!(!destination.exists());
    // Each attempt stopped at the first page size instead of walking
    // the ladder; the outer retry budget was spent.
    assert_eq!(*service.requests.borrow(), 3);
}

struct DeadService;

impl FeatureQuery for DeadService {
    fn query(&self, _layer_url: &str, _params: &QueryParams) -> Result<Value, FetchError> {
        Err(FetchError::new(
            FetchErrorCode::Transport,
            "connection refused",
        ))
    }

    fn service_info(&self, _service_url: &str) -> Result<Value, FetchError> {
        Err(FetchError::new(
            FetchErrorCode::Transport,
            "connection refused",
        ))
    }
}

#[test]
fn exhausted_download_names_its_destination() {
    let dir = tempfile::tempdir().expect("tempdir");
    let destination = dir.path().join("caf_admin0.json");

    let error = fetch_layer(
        &DeadService,
        "https://server.example/rest/services/caf/FeatureServer/0",
        GeometryKind::Polygon,
        &destination,
        &fast_retry(),
    )
    .expect_err("nothing to download");

    assert_eq!(error.code, FetchErrorCode::Exhausted);
    assert!(error.to_string().contains("caf_admin0.json"));
    assert!(!destination.exists());
}
