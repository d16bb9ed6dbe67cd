//! World Bank Indicators API connector.
//!
//! Unauthenticated; responses are a two-element `[metadata, data]` array and
//! the data element can itself be null. Dates are usually bare years.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;

use super::{
    apply_multiplier, http_client, ConnectorConfig, FetchResult, MetricConnector, PROBE_TIMEOUT,
};
use crate::models::Observation;

const BASE_URL: &str = "https://api.worldbank.org/v2";
const SOURCE: &str = "worldbank";
/// Country aggregate used when config carries none.
const DEFAULT_COUNTRY: &str = "WLD";

pub struct WorldBankConnector {
    client: Client,
}

impl WorldBankConnector {
    pub fn new() -> Self {
        Self {
            client: http_client(),
        }
    }
}

impl Default for WorldBankConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricConnector for WorldBankConnector {
    fn source(&self) -> &'static str {
        SOURCE
    }

    async fn fetch(&self, config: &ConnectorConfig) -> FetchResult {
        let indicator = match config.indicator.as_deref() {
            Some(ind) if !ind.is_empty() => ind,
            _ => return FetchResult::err(SOURCE, "indicator required for World Bank connector"),
        };
        let country = config.country.as_deref().unwrap_or(DEFAULT_COUNTRY);

        let url = format!("{BASE_URL}/country/{country}/indicator/{indicator}");
        let params = [("format", "json"), ("per_page", "100"), ("mrv", "50")];

        let resp = match self.client.get(&url).query(&params).send().await {
            Ok(resp) => resp,
            Err(e) => return FetchResult::err(SOURCE, e.to_string()),
        };
        if !resp.status().is_success() {
            return FetchResult::err(SOURCE, format!("World Bank API error: {}", resp.status()));
        }

        let json: Value = match resp.json().await {
            Ok(json) => json,
            Err(e) => return FetchResult::err(SOURCE, e.to_string()),
        };

        // Envelope: [metadata, data_array]; data_array can be null.
        match json.as_array() {
            Some(arr) if arr.len() >= 2 => {
                let data = arr[1].clone();
                if data.is_null() {
                    FetchResult::ok(SOURCE, Value::Array(Vec::new()))
                } else {
                    FetchResult::ok(SOURCE, data)
                }
            }
            _ => FetchResult::err(SOURCE, "unexpected World Bank response format"),
        }
    }

    /// Year-only dates become `YYYY-01-01`. Output sorted by date descending.
    fn normalize(&self, config: &ConnectorConfig, raw: &Value) -> Vec<Observation> {
        let items = match raw.as_array() {
            Some(items) => items,
            None => return Vec::new(),
        };

        let mut observations = Vec::new();
        for item in items {
            let value = match item["value"].as_f64() {
                Some(v) => v,
                None => continue,
            };
            let date_str = item["date"].as_str().unwrap_or("");
            if date_str.is_empty() {
                continue;
            }
            let obs_date = if date_str.len() == 4 {
                format!("{date_str}-01-01")
            } else {
                date_str.to_string()
            };

            observations.push(Observation {
                metric_id: config.metric_id.clone(),
                obs_date,
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
        self.client
            .get(format!("{BASE_URL}/country/WLD/indicator/NY.GDP.MKTP.CD"))
            .query(&[("format", "json"), ("per_page", "1")])
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map(|resp| resp.status().is_success())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> ConnectorConfig {
        ConnectorConfig {
            metric_id: "world.gdp".into(),
            name: "World GDP".into(),
            frequency: "annual".into(),
            indicator: Some("NY.GDP.MKTP.CD".into()),
            country: Some("WLD".into()),
            unit: Some("$T".into()),
            decimals: 2,
            multiplier: 1e-12,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn fetch_requires_indicator() {
        let connector = WorldBankConnector::new();
        let mut config = config();
        config.indicator = None;

        let result = connector.fetch(&config).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("indicator required"));
    }

    #[test]
    fn normalize_year_dates_and_multiplier() {
        let connector = WorldBankConnector::new();
        let raw = json!([
            { "date": "2023", "value": 105_000_000_000_000.0 },
            { "date": "2022", "value": 100_000_000_000_000.0 },
            { "date": "2021", "value": null }
        ]);

        let obs = connector.normalize(&config(), &raw);

        assert_eq!(obs.len(), 2); // null skipped
        assert_eq!(obs[0].obs_date, "2023-01-01");
        assert_eq!(obs[0].value, 105.0); // 1e-12 multiplier -> trillions
        assert_eq!(obs[1].obs_date, "2022-01-01");
    }

    #[test]
    fn normalize_sorts_descending() {
        let connector = WorldBankConnector::new();
        let raw = json!([
            { "date": "2021", "value": 1.0 },
            { "date": "2023", "value": 3.0 },
            { "date": "2022", "value": 2.0 }
        ]);

        let obs = connector.normalize(&config(), &raw);
        let dates: Vec<_> = obs.iter().map(|o| o.obs_date.as_str()).collect();
        assert_eq!(dates, vec!["2023-01-01", "2022-01-01", "2021-01-01"]);
    }

    #[test]
    fn normalize_full_dates_pass_through() {
        let connector = WorldBankConnector::new();
        let raw = json!([{ "date": "2023-06-01", "value": 1e12 }]);

        let obs = connector.normalize(&config(), &raw);
        assert_eq!(obs[0].obs_date, "2023-06-01");
    }
}
