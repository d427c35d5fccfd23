// SPDX-License-Identifier: Apache-2.0

//! Service and catalog metadata: which layers exist, and how fresh
//! the published copy of a country is.

use chrono::{DateTime, NaiveDateTime, Utc};
use codab_model::Iso3;
use regex::Regex;
use reqwest::blocking::Client;
use serde_json::Value;
use std::sync::OnceLock;
use std::time::Duration;

use crate::{FetchError, FetchErrorCode};

fn polygon_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([a-z]{3})_admin(\d+)$").expect("literal pattern"))
}

fn lines_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([a-z]{3})_adminlines$").expect("literal pattern"))
}

fn points_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([a-z]{3})_admincentroids$").expect("literal pattern"))
}

fn service_layers(info: &Value) -> impl Iterator<Item = (u64, &str)> {
    info.get("layers")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .filter_map(|layer| {
            let id = layer.get("id").and_then(Value::as_u64)?;
            let name = layer.get("name").and_then(Value::as_str)?;
            Some((id, name))
        })
}

/// Polygon boundary layers advertised by a feature service, as
/// (country, admin level, layer id), sorted by layer name.
#[must_use]
pub fn polygon_layer_ids(info: &Value) -> Vec<(Iso3, u8, u64)> {
    let mut found: Vec<(String, Iso3, u8, u64)> = service_layers(info)
        .filter_map(|(id, name)| {
            let caps = polygon_re().captures(name)?;
            let iso3 = Iso3::parse(&caps[1]).ok()?;
            let level: u8 = caps[2].parse().ok()?;
            Some((name.to_string(), iso3, level, id))
        })
        .collect();
    found.sort();
    found
        .into_iter()
        .map(|(_, iso3, level, id)| (iso3, level, id))
        .collect()
}

#[must_use]
pub fn line_layer_ids(info: &Value) -> Vec<(Iso3, u64)> {
    named_layer_ids(info, lines_re())
}

#[must_use]
pub fn point_layer_ids(info: &Value) -> Vec<(Iso3, u64)> {
    named_layer_ids(info, points_re())
}

fn named_layer_ids(info: &Value, re: &Regex) -> Vec<(Iso3, u64)> {
    let mut found: Vec<(String, Iso3, u64)> = service_layers(info)
        .filter_map(|(id, name)| {
            let caps = re.captures(name)?;
            let iso3 = Iso3::parse(&caps[1]).ok()?;
            Some((name.to_string(), iso3, id))
        })
        .collect();
    found.sort();
    found.into_iter().map(|(_, iso3, id)| (iso3, id)).collect()
}

/// Last edit instant of a feature service, from `editingInfo` in the
/// service's own metadata (epoch milliseconds).
#[must_use]
pub fn service_last_updated(info: &Value) -> Option<DateTime<Utc>> {
    let millis = info
        .get("editingInfo")
        .and_then(|e| e.get("lastEditDate"))
        .and_then(Value::as_i64)?;
    DateTime::<Utc>::from_timestamp_millis(millis)
}

/// Port over the public dataset catalog, used to decide whether a
/// country's published copy is already current.
pub trait CatalogClient {
    /// Last modification instant of the published dataset for one
    /// country; `None` when the catalog has never seen it.
    fn last_modified(&self, iso3: &Iso3) -> Result<Option<DateTime<Utc>>, FetchError>;
}

/// CKAN `package_show` implementation against a live catalog.
pub struct HttpCatalogClient {
    base_url: String,
    client: Client,
}

impl HttpCatalogClient {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| FetchError::new(FetchErrorCode::Transport, e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

impl CatalogClient for HttpCatalogClient {
    fn last_modified(&self, iso3: &Iso3) -> Result<Option<DateTime<Utc>>, FetchError> {
        let url = format!("{}/api/3/action/package_show", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("id", format!("cod-ab-{}", iso3.lower()))])
            .send()
            .map_err(|e| FetchError::new(FetchErrorCode::Transport, e.to_string()))?;
        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(FetchError::new(
                FetchErrorCode::ServiceError,
                format!("catalog returned {}", response.status()),
            ));
        }
        let payload: Value = response
            .json()
            .map_err(|e| FetchError::new(FetchErrorCode::Decode, e.to_string()))?;
        let stamp = payload
            .get("result")
            .and_then(|r| r.get("last_modified"))
            .and_then(Value::as_str);
        let Some(stamp) = stamp else {
            return Ok(None);
        };
        // CKAN emits a naive UTC timestamp with fractional seconds.
        let parsed = NaiveDateTime::parse_from_str(stamp, "%Y-%m-%dT%H:%M:%S%.f")
            .map_err(|e| FetchError::new(FetchErrorCode::Decode, format!("{stamp}: {e}")))?;
        Ok(Some(parsed.and_utc()))
    }
}
