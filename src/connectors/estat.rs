//! Japan e-Stat Statistics Dashboard connector.
//!
//! Unauthenticated open API. Responses wrap the payload in an envelope with
//! an embedded status code, so both fetch and the health probe inspect
//! `GET_STATS.RESULT.status` in addition to the HTTP status.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;

use super::period::parse_estat_period;
use super::{
    apply_multiplier, http_client, ConnectorConfig, FetchResult, MetricConnector, PROBE_TIMEOUT,
};
use crate::models::Observation;

const BASE_URL: &str = "https://dashboard.e-stat.go.jp/api/1.0";
const SOURCE: &str = "estat_dashboard";
/// Unemployment rate, used as the probe indicator.
const PROBE_INDICATOR: &str = "0301010000020020010";

pub struct EstatDashboardConnector {
    client: Client,
}

impl EstatDashboardConnector {
    pub fn new() -> Self {
        Self {
            client: http_client(),
        }
    }
}

impl Default for EstatDashboardConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricConnector for EstatDashboardConnector {
    fn source(&self) -> &'static str {
        SOURCE
    }

    async fn fetch(&self, config: &ConnectorConfig) -> FetchResult {
        let indicator_code = match config.indicator_code.as_deref() {
            Some(code) if !code.is_empty() => code,
            _ => {
                return FetchResult::err(
                    SOURCE,
                    "indicator_code required for e-Stat Dashboard connector",
                )
            }
        };

        let url = format!("{BASE_URL}/Json/getData");
        let resp = match self
            .client
            .get(&url)
            .query(&[("IndicatorCode", indicator_code)])
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return FetchResult::err(SOURCE, e.to_string()),
        };
        if !resp.status().is_success() {
            return FetchResult::err(SOURCE, format!("e-Stat API error: {}", resp.status()));
        }

        let json: Value = match resp.json().await {
            Ok(json) => json,
            Err(e) => return FetchResult::err(SOURCE, e.to_string()),
        };

        let result = &json["GET_STATS"]["RESULT"];
        if result["status"].as_str() != Some("0") {
            let msg = result["errorMsg"].as_str().unwrap_or("Unknown error");
            return FetchResult::err(SOURCE, format!("e-Stat API error: {msg}"));
        }

        let data_objs = &json["GET_STATS"]["STATISTICAL_DATA"]["DATA_INF"]["DATA_OBJ"];
        match data_objs.as_array() {
            Some(arr) if !arr.is_empty() => FetchResult::ok(SOURCE, data_objs.clone()),
            _ => FetchResult::err(SOURCE, "no data returned from e-Stat API"),
        }
    }

    /// `DATA_OBJ[].VALUE` records carry the value in `$` and the period in
    /// `@time`. Output sorted by date descending.
    fn normalize(&self, config: &ConnectorConfig, raw: &Value) -> Vec<Observation> {
        let items = match raw.as_array() {
            Some(items) => items,
            None => return Vec::new(),
        };

        let mut observations = Vec::new();
        for item in items {
            let value_obj = &item["VALUE"];
            if !value_obj.is_object() {
                continue;
            }
            let value_str = value_obj["$"].as_str().unwrap_or("");
            if value_str.is_empty() {
                continue;
            }
            let value = match value_str.parse::<f64>() {
                Ok(v) => v,
                Err(_) => continue,
            };
            let obs_date = match value_obj["@time"]
                .as_str()
                .and_then(parse_estat_period)
            {
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

    /// Unlike the other sources, a 200 is not enough: the body carries its
    /// own status code.
    async fn health_check(&self) -> bool {
        let resp = match self
            .client
            .get(format!("{BASE_URL}/Json/getData"))
            .query(&[("IndicatorCode", PROBE_INDICATOR)])
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(_) => return false,
        };
        if !resp.status().is_success() {
            return false;
        }
        match resp.json::<Value>().await {
            Ok(json) => json["GET_STATS"]["RESULT"]["status"].as_str() == Some("0"),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> ConnectorConfig {
        ConnectorConfig {
            metric_id: "japan.unemployment".into(),
            name: "Japan Unemployment".into(),
            frequency: "monthly".into(),
            indicator_code: Some("0301010000020020010".into()),
            unit: Some("%".into()),
            decimals: 1,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn fetch_requires_indicator_code() {
        let connector = EstatDashboardConnector::new();
        let mut config = config();
        config.indicator_code = None;

        let result = connector.fetch(&config).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("indicator_code required"));
    }

    #[test]
    fn normalize_parses_period_forms() {
        let connector = EstatDashboardConnector::new();
        let raw = json!([
            { "VALUE": { "@time": "202411M00", "@cycle": "1", "$": "2.5" } },
            { "VALUE": { "@time": "20243Q00", "@cycle": "2", "$": "2.4" } },
            { "VALUE": { "@time": "2024FY00", "@cycle": "3", "$": "2.3" } },
            { "VALUE": { "@time": "2024CY00", "@cycle": "3", "$": "2.2" } }
        ]);

        let obs = connector.normalize(&config(), &raw);

        assert_eq!(obs.len(), 4);
        let dates: Vec<_> = obs.iter().map(|o| o.obs_date.as_str()).collect();
        // Descending: Nov monthly, Q3 (July), FY (April), CY (January).
        assert_eq!(
            dates,
            vec!["2024-11-01", "2024-07-01", "2024-04-01", "2024-01-01"]
        );
    }

    #[test]
    fn normalize_skips_empty_values_and_bad_periods() {
        let connector = EstatDashboardConnector::new();
        let raw = json!([
            { "VALUE": { "@time": "202411M00", "$": "" } },
            { "VALUE": { "@time": "??", "$": "1.0" } },
            { "VALUE": { "@time": "202410M00", "$": "abc" } },
            { "NOT_VALUE": {} },
            { "VALUE": { "@time": "202409M00", "$": "3.0" } }
        ]);

        let obs = connector.normalize(&config(), &raw);
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].obs_date, "2024-09-01");
        assert_eq!(obs[0].value, 3.0);
    }
}
