//! OECD SDMX connector.
//!
//! Unauthenticated. A static table maps internal metric ids to OECD dataflow
//! and series-key pairs; config fields override when present. Unlike ECB,
//! the SDMX envelope sits under a top-level `data` key and a request can
//! return multiple series.

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

const BASE_URL: &str = "https://sdmx.oecd.org/public/rest/data";
const SOURCE: &str = "oecd";
const SDMX_ACCEPT: &str = "application/vnd.sdmx.data+json;charset=utf-8;version=1.0";

/// metric_id -> (dataflow, series key). Protocol knowledge, not user policy.
const METRIC_MAP: &[(&str, (&str, &str))] = &[
    ("us.cpi_yoy", ("PRICES_CPI", "USA.CPALTT01.GY.M")),
    ("us.core_cpi_yoy", ("PRICES_CPI", "USA.CPGRLE01.GY.M")),
    ("us.unemployment", ("MEI", "USA.LRHUTTTT.STSA.M")),
    ("us.gdp_qoq", ("QNA", "USA.B1_GE.GYSA.Q")),
    ("eu.unemployment", ("MEI", "EA20.LRHUTTTT.STSA.M")),
    ("eu.deposit_rate", ("MEI_FIN", "EA20.IR3TIB.ST.M")),
    ("japan.policy_rate", ("MEI_FIN", "JPN.IR3TIB.ST.M")),
    ("japan.cpi_yoy", ("PRICES_CPI", "JPN.CPALTT01.GY.M")),
    ("global.brent", ("MEI", "OECD.OILBRNT.STSA.M")),
];

fn metric_mapping(metric_id: &str) -> Option<(&'static str, &'static str)> {
    METRIC_MAP
        .iter()
        .find(|(id, _)| *id == metric_id)
        .map(|(_, pair)| *pair)
}

pub struct OecdConnector {
    client: Client,
}

impl OecdConnector {
    pub fn new() -> Self {
        Self {
            client: http_client(),
        }
    }

    fn time_periods(raw: &Value) -> Vec<String> {
        let dims = raw["data"]["structure"]["dimensions"]["observation"]
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

impl Default for OecdConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricConnector for OecdConnector {
    fn source(&self) -> &'static str {
        SOURCE
    }

    async fn fetch(&self, config: &ConnectorConfig) -> FetchResult {
        let mapping = metric_mapping(&config.metric_id);
        let dataflow = config
            .dataflow
            .as_deref()
            .or(mapping.map(|(d, _)| d))
            .unwrap_or("");
        let series_key = config
            .series_key
            .as_deref()
            .or(mapping.map(|(_, k)| k))
            .unwrap_or("");

        if dataflow.is_empty() || series_key.is_empty() {
            return FetchResult::err(
                SOURCE,
                format!("no OECD mapping for {}", config.metric_id),
            );
        }

        let url = format!("{BASE_URL}/OECD.SDD.STES,DSD_{dataflow}@DF_{dataflow}/{series_key}");
        let params = [
            ("startPeriod", "2020-01"),
            ("dimensionAtObservation", "AllDimensions"),
        ];

        let resp = match self
            .client
            .get(&url)
            .query(&params)
            .header("Accept", SDMX_ACCEPT)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return FetchResult::err(SOURCE, e.to_string()),
        };
        if !resp.status().is_success() {
            return FetchResult::err(SOURCE, format!("OECD API error: {}", resp.status()));
        }
        match resp.json::<Value>().await {
            Ok(json) => FetchResult::ok(SOURCE, json),
            Err(e) => FetchResult::err(SOURCE, e.to_string()),
        }
    }

    /// Iterates every series in the first dataset. Output sorted descending.
    fn normalize(&self, config: &ConnectorConfig, raw: &Value) -> Vec<Observation> {
        let time_values = Self::time_periods(raw);
        if time_values.is_empty() {
            warn!(metric = %config.metric_id, "OECD payload has no TIME_PERIOD dimension");
            return Vec::new();
        }

        let series = match raw["data"]["dataSets"][0]["series"].as_object() {
            Some(series) => series,
            None => return Vec::new(),
        };

        let mut observations = Vec::new();
        for series_data in series.values() {
            let obs_map = match series_data["observations"].as_object() {
                Some(m) => m,
                None => continue,
            };
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
        }

        observations.sort_by(|a, b| b.obs_date.cmp(&a.obs_date));
        observations
    }

    async fn health_check(&self) -> bool {
        self.client
            .get(format!(
                "{BASE_URL}/OECD.SDD.STES,DSD_PRICES_CPI@DF_PRICES_CPI/USA.CPALTT01.GY.M"
            ))
            .query(&[("startPeriod", "2024-01")])
            .header("Accept", "application/vnd.sdmx.data+json")
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map(|resp| resp.status().is_success())
            .unwrap_or(false)
    }
}
