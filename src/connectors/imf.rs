//! IMF DataMapper connector.
//!
//! Unauthenticated, annual data (history plus forecasts). The payload is a
//! dict-of-dicts: `values[INDICATOR][COUNTRY][YEAR] = value`.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;

use super::{
    apply_multiplier, http_client, ConnectorConfig, FetchResult, MetricConnector, PROBE_TIMEOUT,
};
use crate::models::Observation;

const BASE_URL: &str = "https://www.imf.org/external/datamapper/api/v1";
const SOURCE: &str = "imf";
/// Country used when config carries none.
const DEFAULT_COUNTRY: &str = "CHN";

pub struct ImfConnector {
    client: Client,
}

impl ImfConnector {
    pub fn new() -> Self {
        Self {
            client: http_client(),
        }
    }
}

impl Default for ImfConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricConnector for ImfConnector {
    fn source(&self) -> &'static str {
        SOURCE
    }

    async fn fetch(&self, config: &ConnectorConfig) -> FetchResult {
        let indicator = match config.indicator.as_deref() {
            Some(ind) if !ind.is_empty() => ind,
            _ => return FetchResult::err(SOURCE, "indicator required for IMF connector"),
        };
        let country = config.country.as_deref().unwrap_or(DEFAULT_COUNTRY);

        let url = format!("{BASE_URL}/{indicator}/{country}");
        let resp = match self.client.get(&url).send().await {
            Ok(resp) => resp,
            Err(e) => return FetchResult::err(SOURCE, e.to_string()),
        };
        if !resp.status().is_success() {
            return FetchResult::err(SOURCE, format!("IMF API error: {}", resp.status()));
        }

        let json: Value = match resp.json().await {
            Ok(json) => json,
            Err(e) => return FetchResult::err(SOURCE, e.to_string()),
        };

        match json.get("values") {
            Some(values) => FetchResult::ok(SOURCE, values.clone()),
            None => FetchResult::err(SOURCE, "unexpected IMF response format: no values"),
        }
    }

    /// Years become `YYYY-01-01`. Output sorted by date descending.
    fn normalize(&self, config: &ConnectorConfig, raw: &Value) -> Vec<Observation> {
        let indicator = match config.indicator.as_deref() {
            Some(ind) => ind,
            None => return Vec::new(),
        };
        let country = config.country.as_deref().unwrap_or(DEFAULT_COUNTRY);

        let country_data = match raw[indicator][country].as_object() {
            Some(m) => m,
            None => return Vec::new(),
        };

        let mut observations = Vec::new();
        for (year, value) in country_data {
            let value = match value.as_f64() {
                Some(v) => v,
                None => continue,
            };
            if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }

            observations.push(Observation {
                metric_id: config.metric_id.clone(),
                obs_date: format!("{year}-01-01"),
                value: apply_multiplier(value, config),
                unit: config.unit.clone(),
                source: SOURCE.to_string(),
                retrieved_at: Utc::now(),
            });
        }

        observations.sort_by(|a, b| b.obs_date.cmp(&a.obs_date));
        observations
    }

    async fn health_check(&self) -> bool {
        // World GDP growth, a known stable indicator.
        self.client
            .get(format!("{BASE_URL}/NGDP_RPCH/WLD"))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map(|resp| resp.status().is_success())
            .unwrap_or(false)
    }
}
