//! ECB SDMX-JSON connector.
//!
//! Unauthenticated. A series is addressed by dataflow + series key
//! (e.g. `FM` / `M.U2.EUR.4F.KR.DFR.LEV`). The response indexes observation
//! values by position into the TIME_PERIOD dimension's value list.

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

const BASE_URL: &str = "https://data-api.ecb.europa.eu/service/data";
const SOURCE: &str = "ecb";

pub struct EcbConnector {
    client: Client,
}

impl EcbConnector {
    pub fn new() -> Self {
        Self {
            client: http_client(),
        }
    }

    /// Pull the TIME_PERIOD dimension values out of the SDMX structure block.
    fn time_periods(raw: &Value) -> Vec<String> {
        let dims = raw["structure"]["dimensions"]["observation"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        for dim in dims {
            if dim["id"].as_str() == Some("TIME_PERIOD") {
                return dim["values"]
                    .as_array()
                    .map(|values| {
                        values
                            .iter()
                            .filter_map(|v| v["id"].as_str().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default();
            }
        }
        Vec::new()
    }
}

impl Default for EcbConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricConnector for EcbConnector {
    fn source(&self) -> &'static str {
        SOURCE
    }

    async fn fetch(&self, config: &ConnectorConfig) -> FetchResult {
        let (dataflow, series_key) = match (config.dataflow.as_deref(), config.series_key.as_deref())
        {
            (Some(d), Some(k)) if !d.is_empty() && !k.is_empty() => (d, k),
            _ => {
                return FetchResult::err(
                    SOURCE,
                    "dataflow and series_key required for ECB connector",
                )
            }
        };

        let url = format!("{BASE_URL}/{dataflow}/{series_key}");
        let params = [("format", "jsondata"), ("lastNObservations", "500")];

        let resp = match self.client.get(&url).query(&params).send().await {
            Ok(resp) => resp,
            Err(e) => return FetchResult::err(SOURCE, e.to_string()),
        };
        if !resp.status().is_success() {
            return FetchResult::err(SOURCE, format!("ECB API error: {}", resp.status()));
        }
        match resp.json::<Value>().await {
            Ok(json) => FetchResult::ok(SOURCE, json),
            Err(e) => FetchResult::err(SOURCE, e.to_string()),
        }
    }

    /// Walks the first dataset's first series; observation keys index into
    /// the TIME_PERIOD values. Output is sorted by date descending.
    fn normalize(&self, config: &ConnectorConfig, raw: &Value) -> Vec<Observation> {
        let time_values = Self::time_periods(raw);
        if time_values.is_empty() {
            warn!(metric = %config.metric_id, "ECB payload has no TIME_PERIOD dimension");
            return Vec::new();
        }

        let series = match raw["dataSets"][0]["series"].as_object() {
            Some(series) if !series.is_empty() => series,
            _ => return Vec::new(),
        };
        // A specific series key normally yields exactly one series.
        let first_series = match series.values().next() {
            Some(s) => s,
            None => return Vec::new(),
        };
        let obs_map = match first_series["observations"].as_object() {
            Some(m) => m,
            None => return Vec::new(),
        };

        let mut observations = Vec::new();
        for (idx_str, values) in obs_map {
            let idx = match idx_str.parse::<usize>() {
                Ok(i) if i < time_values.len() => i,
                _ => continue,
            };
            let value = match values.get(0).and_then(Value::as_f64) {
                Some(v) => v,
                None => continue,
            };
            let obs_date = match parse_calendar_period(&time_values[idx]) {
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
        // ECB main refinancing rate, a known stable series.
        self.client
            .get(format!("{BASE_URL}/FM/M.U2.EUR.4F.KR.MRR_FR.LEV"))
            .query(&[("format", "jsondata"), ("lastNObservations", "1")])
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map(|resp| resp.status().is_success())
            .unwrap_or(false)
    }
}
