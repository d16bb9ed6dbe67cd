//! Yahoo Finance chart connector.
//!
//! Unofficial endpoint, no authentication, but it rejects default library
//! user agents so a browser UA is sent. A static table maps internal metric
//! ids to Yahoo symbols (futures tickers, the dollar index).

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde_json::Value;
use tracing::warn;

use super::{
    apply_multiplier, browser_client, ConnectorConfig, FetchResult, MetricConnector, PROBE_TIMEOUT,
};
use crate::models::Observation;

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const SOURCE: &str = "yahoo";

/// metric_id -> Yahoo Finance symbol.
const SYMBOL_MAP: &[(&str, &str)] = &[
    ("global.brent", "BZ=F"),
    ("global.dxy", "DX-Y.NYB"),
    ("global.gold", "GC=F"),
    ("global.wti", "CL=F"),
];

fn symbol_for(config: &ConnectorConfig) -> String {
    if let Some((_, sym)) = SYMBOL_MAP.iter().find(|(m, _)| *m == config.metric_id) {
        return (*sym).to_string();
    }
    config
        .series_id
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| config.metric_id.clone())
}

pub struct YahooFinanceConnector {
    client: Client,
}

impl YahooFinanceConnector {
    pub fn new() -> Self {
        Self {
            client: browser_client(),
        }
    }
}

impl Default for YahooFinanceConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricConnector for YahooFinanceConnector {
    fn source(&self) -> &'static str {
        SOURCE
    }

    async fn fetch(&self, config: &ConnectorConfig) -> FetchResult {
        let symbol = symbol_for(config);
        let url = format!("{BASE_URL}/{symbol}");
        // One month of daily closes, enough for sparklines.
        let params = [("interval", "1d"), ("range", "1mo")];

        let resp = match self.client.get(&url).query(&params).send().await {
            Ok(resp) => resp,
            Err(e) => return FetchResult::err(SOURCE, e.to_string()),
        };
        if !resp.status().is_success() {
            return FetchResult::err(SOURCE, format!("Yahoo API error: {}", resp.status()));
        }
        match resp.json::<Value>().await {
            Ok(json) => FetchResult::ok(SOURCE, json),
            Err(e) => FetchResult::err(SOURCE, e.to_string()),
        }
    }

    /// Pairs the epoch-second timestamp array with the close array; null
    /// closes (market holidays) are dropped. Output sorted descending.
    fn normalize(&self, config: &ConnectorConfig, raw: &Value) -> Vec<Observation> {
        let result = &raw["chart"]["result"][0];
        if result.is_null() {
            warn!(metric = %config.metric_id, "Yahoo payload has no chart result");
            return Vec::new();
        }

        let timestamps = result["timestamp"].as_array().cloned().unwrap_or_default();
        let closes = result["indicators"]["quote"][0]["close"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        let mut observations = Vec::new();
        for (ts, close) in timestamps.iter().zip(closes.iter()) {
            let close = match close.as_f64() {
                Some(c) => c,
                None => continue,
            };
            let ts = match ts.as_i64() {
                Some(t) => t,
                None => continue,
            };
            let obs_date = match Utc.timestamp_opt(ts, 0).single() {
                Some(dt) => dt.format("%Y-%m-%d").to_string(),
                None => continue,
            };

            observations.push(Observation {
                metric_id: config.metric_id.clone(),
                obs_date,
                value: apply_multiplier(close, config),
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
            .get(format!("{BASE_URL}/BZ=F"))
            .query(&[("interval", "1d"), ("range", "1d")])
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map(|resp| resp.status().is_success())
            .unwrap_or(false)
    }
}
