//! DBnomics connector.
//!
//! Unauthenticated. A series is addressed by a `provider/dataset/series`
//! path carried in `series_id`; the series document holds parallel `period`
//! and `value` arrays.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use tracing::warn;

use super::period::parse_calendar_period;
use super::{
    apply_multiplier, http_client, ConnectorConfig, FetchResult, MetricConnector, PROBE_TIMEOUT,
};
use crate::models::Observation;

const BASE_URL: &str = "https://api.db.nomics.world/v22";
const SOURCE: &str = "dbnomics";

pub struct DbnomicsConnector {
    client: Client,
}

impl DbnomicsConnector {
    pub fn new() -> Self {
        Self {
            client: http_client(),
        }
    }
}

impl Default for DbnomicsConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricConnector for DbnomicsConnector {
    fn source(&self) -> &'static str {
        SOURCE
    }

    async fn fetch(&self, config: &ConnectorConfig) -> FetchResult {
        let series_path = match config.series_id.as_deref() {
            Some(path) if !path.is_empty() => path,
            _ => {
                return FetchResult::err(
                    SOURCE,
                    "series_id (format: provider/dataset/series) required for DBnomics connector",
                )
            }
        };

        let url = format!("{BASE_URL}/series/{series_path}");
        let params = [("observations", "1"), ("format", "json")];

        let resp = match self.client.get(&url).query(&params).send().await {
            Ok(resp) => resp,
            Err(e) => return FetchResult::err(SOURCE, e.to_string()),
        };
        if !resp.status().is_success() {
            return FetchResult::err(SOURCE, format!("DBnomics API error: {}", resp.status()));
        }

        let json: Value = match resp.json().await {
            Ok(json) => json,
            Err(e) => return FetchResult::err(SOURCE, e.to_string()),
        };

        // The first (usually only) series document.
        match json["series"]["docs"].get(0) {
            Some(doc) => FetchResult::ok(SOURCE, doc.clone()),
            None => FetchResult::err(SOURCE, "no series data in DBnomics response"),
        }
    }

    /// Zips the parallel period/value arrays; a length mismatch yields
    /// nothing. Output sorted by date descending.
    fn normalize(&self, config: &ConnectorConfig, raw: &Value) -> Vec<Observation> {
        let periods = raw["period"].as_array().cloned().unwrap_or_default();
        let values = raw["value"].as_array().cloned().unwrap_or_default();

        if periods.len() != values.len() {
            warn!(
                metric = %config.metric_id,
                periods = periods.len(),
                values = values.len(),
                "DBnomics period/value arrays differ in length"
            );
            return Vec::new();
        }

        let mut observations = Vec::new();
        for (period, value) in periods.iter().zip(values.iter()) {
            let value = match value.as_f64() {
                Some(v) => v,
                None => continue,
            };
            let obs_date = match period.as_str().and_then(parse_calendar_period) {
                Some(d) => d,
                None => continue,
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
            .get(format!("{BASE_URL}/providers"))
            .query(&[("limit", "1")])
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
            metric_id: "us.ism_pmi".into(),
            name: "ISM Manufacturing PMI".into(),
            frequency: "monthly".into(),
            series_id: Some("ISM/pmi/pm".into()),
            decimals: 1,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn fetch_requires_series_path() {
        let connector = DbnomicsConnector::new();
        let mut config = config();
        config.series_id = None;

        let result = connector.fetch(&config).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("series_id"));
    }

    #[test]
    fn normalize_zips_periods_and_values() {
        let connector = DbnomicsConnector::new();
        let raw = json!({
            "period": ["2024-01", "2024-02", "2024-03"],
            "value": [50.3, null, 49.1]
        });

        let obs = connector.normalize(&config(), &raw);

        assert_eq!(obs.len(), 2); // null dropped
        assert_eq!(obs[0].obs_date, "2024-03-01");
        assert_eq!(obs[0].value, 49.1);
        assert_eq!(obs[1].obs_date, "2024-01-01");
        assert_eq!(obs[1].value, 50.3);
    }

    #[test]
    fn normalize_length_mismatch_is_empty() {
        let connector = DbnomicsConnector::new();
        let raw = json!({
            "period": ["2024-01", "2024-02"],
            "value": [50.3]
        });

        assert!(connector.normalize(&config(), &raw).is_empty());
    }

    #[test]
    fn normalize_quarterly_and_annual_periods() {
        let connector = DbnomicsConnector::new();
        let raw = json!({
            "period": ["2024-Q2", "2023"],
            "value": [1.0, 2.0]
        });

        let obs = connector.normalize(&config(), &raw);
        assert_eq!(obs[0].obs_date, "2024-04-01");
        assert_eq!(obs[1].obs_date, "2023-01-01");
    }
}
