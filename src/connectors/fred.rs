//! FRED (Federal Reserve Economic Data) connector.
//!
//! Requires a free API key. Observations are requested in descending date
//! order (`sort_order=desc`) and passed through as-is; FRED uses `"."` as its
//! missing-value sentinel and those points are dropped.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;

use super::{
    apply_multiplier, http_client, ConnectorConfig, FetchResult, MetricConnector, PROBE_TIMEOUT,
};
use crate::models::Observation;

const BASE_URL: &str = "https://api.stlouisfed.org/fred";
const SOURCE: &str = "fred";

pub struct FredConnector {
    api_key: String,
    client: Client,
}

impl FredConnector {
    /// The key is a hard constructor requirement so the credential dependency
    /// is visible at the call site; see `Credentials` in the pipeline for the
    /// environment-backed path.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: http_client(),
        }
    }
}

#[async_trait]
impl MetricConnector for FredConnector {
    fn source(&self) -> &'static str {
        SOURCE
    }

    async fn fetch(&self, config: &ConnectorConfig) -> FetchResult {
        let series_id = match config.series_id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => return FetchResult::err(SOURCE, "series_id required for FRED connector"),
        };

        let url = format!("{BASE_URL}/series/observations");
        let params = [
            ("series_id", series_id),
            ("api_key", self.api_key.as_str()),
            ("file_type", "json"),
            ("sort_order", "desc"),
            ("limit", "500"),
        ];

        let resp = match self.client.get(&url).query(&params).send().await {
            Ok(resp) => resp,
            Err(e) => return FetchResult::err(SOURCE, e.to_string()),
        };
        if !resp.status().is_success() {
            return FetchResult::err(SOURCE, format!("FRED API error: {}", resp.status()));
        }

        let json: Value = match resp.json().await {
            Ok(json) => json,
            Err(e) => return FetchResult::err(SOURCE, e.to_string()),
        };

        match json.get("observations") {
            Some(obs) if obs.is_array() => FetchResult::ok(SOURCE, obs.clone()),
            _ => FetchResult::err(SOURCE, "unexpected FRED response format: no observations"),
        }
    }

    /// FRED dates are already full `YYYY-MM-DD`; values arrive as strings.
    /// Output keeps the API's descending order.
    fn normalize(&self, config: &ConnectorConfig, raw: &Value) -> Vec<Observation> {
        let items = match raw.as_array() {
            Some(items) => items,
            None => return Vec::new(),
        };

        let mut observations = Vec::new();
        for item in items {
            let value_str = item["value"].as_str().unwrap_or(".");
            if value_str == "." || value_str.is_empty() {
                continue;
            }
            let value = match value_str.parse::<f64>() {
                Ok(v) => v,
                Err(_) => continue,
            };
            let date = match item["date"].as_str() {
                Some(d) => d,
                None => continue,
            };

            observations.push(Observation {
                metric_id: config.metric_id.clone(),
                obs_date: date.to_string(),
                value: apply_multiplier(value, config),
                unit: config.unit.clone(),
                source: SOURCE.to_string(),
                retrieved_at: Utc::now(),
            });
        }
        observations
    }

    async fn health_check(&self) -> bool {
        // Real GNP, a very stable series.
        let params = [
            ("series_id", "GNPCA"),
            ("api_key", self.api_key.as_str()),
            ("file_type", "json"),
        ];
        self.client
            .get(format!("{BASE_URL}/series"))
            .query(&params)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map(|resp| resp.status().is_success())
            .unwrap_or(false)
    }
}
