//! CoinGecko connector.
//!
//! Free tier, no authentication, rate limited to 10-30 calls/minute (the
//! pipeline paces this source accordingly). Produces a single spot-price
//! observation dated today.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;

use super::{
    apply_multiplier, http_client, ConnectorConfig, FetchResult, MetricConnector, PROBE_TIMEOUT,
};
use crate::models::Observation;

const BASE_URL: &str = "https://api.coingecko.com/api/v3";
const SOURCE: &str = "coingecko";

/// metric_id -> CoinGecko coin id.
const COIN_MAP: &[(&str, &str)] = &[
    ("crypto.bitcoin", "bitcoin"),
    ("crypto.ethereum", "ethereum"),
];

/// Resolve a coin id: static table first, then `series_id`, then the last
/// dot-segment of the metric id.
fn coin_id(config: &ConnectorConfig) -> String {
    if let Some((_, id)) = COIN_MAP.iter().find(|(m, _)| *m == config.metric_id) {
        return (*id).to_string();
    }
    if let Some(series_id) = config.series_id.as_deref() {
        if !series_id.is_empty() {
            return series_id.to_string();
        }
    }
    config
        .metric_id
        .rsplit('.')
        .next()
        .unwrap_or(&config.metric_id)
        .to_string()
}

pub struct CoinGeckoConnector {
    client: Client,
}

impl CoinGeckoConnector {
    pub fn new() -> Self {
        Self {
            client: http_client(),
        }
    }
}

impl Default for CoinGeckoConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricConnector for CoinGeckoConnector {
    fn source(&self) -> &'static str {
        SOURCE
    }

    async fn fetch(&self, config: &ConnectorConfig) -> FetchResult {
        let coin = coin_id(config);
        let url = format!("{BASE_URL}/coins/{coin}");
        let params = [
            ("localization", "false"),
            ("tickers", "false"),
            ("market_data", "true"),
            ("community_data", "false"),
            ("developer_data", "false"),
            ("sparkline", "false"),
        ];

        let resp = match self.client.get(&url).query(&params).send().await {
            Ok(resp) => resp,
            Err(e) => return FetchResult::err(SOURCE, e.to_string()),
        };
        if !resp.status().is_success() {
            return FetchResult::err(SOURCE, format!("CoinGecko API error: {}", resp.status()));
        }
        match resp.json::<Value>().await {
            Ok(json) => FetchResult::ok(SOURCE, json),
            Err(e) => FetchResult::err(SOURCE, e.to_string()),
        }
    }

    /// One observation: the current USD price, dated today. Unit defaults to
    /// `$` when config carries none.
    fn normalize(&self, config: &ConnectorConfig, raw: &Value) -> Vec<Observation> {
        let price = match raw["market_data"]["current_price"]["usd"].as_f64() {
            Some(p) => p,
            None => return Vec::new(),
        };

        vec![Observation {
            metric_id: config.metric_id.clone(),
            obs_date: Utc::now().format("%Y-%m-%d").to_string(),
            value: apply_multiplier(price, config),
            unit: config.unit.clone().or_else(|| Some("$".to_string())),
            source: SOURCE.to_string(),
            retrieved_at: Utc::now(),
        }]
    }

    async fn health_check(&self) -> bool {
        self.client
            .get(format!("{BASE_URL}/ping"))
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
            metric_id: "crypto.bitcoin".into(),
            name: "Bitcoin".into(),
            frequency: "daily".into(),
            decimals: 0,
            ..Default::default()
        }
    }

    #[test]
    fn coin_id_resolution_order() {
        assert_eq!(coin_id(&config()), "bitcoin");

        let mut cfg = config();
        cfg.metric_id = "crypto.solana".into();
        cfg.series_id = Some("solana".into());
        assert_eq!(coin_id(&cfg), "solana");

        cfg.series_id = None;
        assert_eq!(coin_id(&cfg), "solana"); // metric_id suffix fallback
    }

    #[test]
    fn normalize_single_spot_observation() {
        let connector = CoinGeckoConnector::new();
        let raw = json!({
            "market_data": {
                "current_price": { "usd": 42000.0 },
                "price_change_percentage_24h": -2.5
            }
        });

        let obs = connector.normalize(&config(), &raw);

        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].value, 42000.0);
        assert_eq!(obs[0].unit.as_deref(), Some("$"));
        assert_eq!(obs[0].source, "coingecko");
    }

    #[test]
    fn normalize_missing_price_is_empty() {
        let connector = CoinGeckoConnector::new();
        let raw = json!({ "market_data": { "current_price": {} } });
        assert!(connector.normalize(&config(), &raw).is_empty());
    }

    #[test]
    fn normalize_keeps_configured_unit() {
        let connector = CoinGeckoConnector::new();
        let mut cfg = config();
        cfg.unit = Some("USD".into());
        let raw = json!({ "market_data": { "current_price": { "usd": 1.0 } } });

        let obs = connector.normalize(&cfg, &raw);
        assert_eq!(obs[0].unit.as_deref(), Some("USD"));
    }
}
