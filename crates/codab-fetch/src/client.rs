// SPDX-License-Identifier: Apache-2.0

use reqwest::blocking::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::{FetchError, FetchErrorCode};

/// One page request against a feature-service layer query endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryParams {
    /// `resultRecordCount`; `None` asks for the server's full result.
    pub result_record_count: Option<u32>,
    /// `resultOffset` for pagination.
    pub result_offset: Option<u64>,
}

/// Port over the remote feature service. Mocked in tests; implemented
/// by [`ArcGisClient`] in production.
pub trait FeatureQuery {
    /// Execute `<layer_url>/query` and return the raw JSON payload.
    fn query(&self, layer_url: &str, params: &QueryParams) -> Result<Value, FetchError>;

    /// Fetch `<service_url>?f=json` service metadata.
    fn service_info(&self, service_url: &str) -> Result<Value, FetchError>;
}

/// Injected capability producing an authentication token per request.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Result<String, FetchError>;
}

/// Fixed token, for tests and pre-issued credentials.
pub struct StaticToken(pub String);

impl TokenProvider for StaticToken {
    fn token(&self) -> Result<String, FetchError> {
        Ok(self.0.clone())
    }
}

/// Exchanges username/password for a portal token on every call.
pub struct PortalTokenProvider {
    server: String,
    username: String,
    password: String,
    client: Client,
}

impl PortalTokenProvider {
    pub fn new(server: &str, username: &str, password: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| FetchError::new(FetchErrorCode::Transport, e.to_string()))?;
        Ok(Self {
            server: server.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            client,
        })
    }
}

impl TokenProvider for PortalTokenProvider {
    fn token(&self) -> Result<String, FetchError> {
        let url = format!("{}/portal/sharing/rest/generateToken", self.server);
        let referer = format!("{}/portal", self.server);
        let form = [
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
            ("referer", referer.as_str()),
            ("f", "json"),
        ];
        let payload: Value = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .map_err(|e| FetchError::new(FetchErrorCode::Token, e.to_string()))?
            .json()
            .map_err(|e| FetchError::new(FetchErrorCode::Token, e.to_string()))?;
        payload
            .get("token")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| {
                FetchError::new(FetchErrorCode::Token, "token missing from portal response")
            })
    }
}

/// Blocking HTTP client for the feature service.
///
/// Query parameters are fixed: all records, all fields, deterministic
/// ordering by object id so pagination never skips or duplicates
/// features under concurrent server-side edits.
pub struct ArcGisClient {
    client: Client,
    token_provider: Arc<dyn TokenProvider>,
}

impl ArcGisClient {
    pub fn new(
        token_provider: Arc<dyn TokenProvider>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::new(FetchErrorCode::Transport, e.to_string()))?;
        Ok(Self {
            client,
            token_provider,
        })
    }

    fn get_json(&self, url: &str, params: &[(String, String)]) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .map_err(|e| FetchError::new(FetchErrorCode::Transport, e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FetchErrorCode::ServiceError,
                format!("{url} returned {status}"),
            ));
        }
        response
            .json()
            .map_err(|e| FetchError::new(FetchErrorCode::Decode, e.to_string()))
    }
}

impl FeatureQuery for ArcGisClient {
    fn query(&self, layer_url: &str, params: &QueryParams) -> Result<Value, FetchError> {
        let token = self.token_provider.token()?;
        let mut query: Vec<(String, String)> = vec![
            ("f".to_string(), "json".to_string()),
            ("where".to_string(), "1=1".to_string()),
            ("outFields".to_string(), "*".to_string()),
            ("orderByFields".to_string(), "objectid".to_string()),
            ("token".to_string(), token),
        ];
        if let Some(count) = params.result_record_count {
            query.push(("resultRecordCount".to_string(), count.to_string()));
        }
        if let Some(offset) = params.result_offset {
            query.push(("resultOffset".to_string(), offset.to_string()));
        }
        self.get_json(&format!("{layer_url}/query"), &query)
    }

    fn service_info(&self, service_url: &str) -> Result<Value, FetchError> {
        let token = self.token_provider.token()?;
        let query = vec![
            ("f".to_string(), "json".to_string()),
            ("token".to_string(), token),
        ];
        self.get_json(service_url, &query)
    }
}
