//! HuggingFace Open LLM Leaderboard connector.
//!
//! Reads the leaderboard dataset through the Datasets Server rows API. The
//! dataset is sorted alphabetically, not by score, so fetch samples several
//! offsets and keeps the best scores seen. Model names arrive wrapped in
//! HTML anchor tags.

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::warn;

use super::{
    apply_multiplier, http_client, ConnectorConfig, FetchResult, MetricConnector, PROBE_TIMEOUT,
};
use crate::models::Observation;

const DATASETS_SERVER: &str = "https://datasets-server.huggingface.co";
const DATASET: &str = "open-llm-leaderboard/contents";
const SOURCE: &str = "huggingface";

const SAMPLE_OFFSETS: &[u32] = &[0, 1000, 2000, 3000, 4000];
const BATCH_SIZE: u32 = 100;

/// Approximate frontier average used when the live leaderboard is
/// unreachable and fallback is enabled.
const FALLBACK_TOP_SCORE: f64 = 45.0;

pub struct HuggingFaceConnector {
    client: Client,
    /// When true, an unreachable endpoint yields a tagged estimate instead
    /// of a fetch error.
    allow_fallback: bool,
}

impl HuggingFaceConnector {
    pub fn new(allow_fallback: bool) -> Self {
        Self {
            client: http_client(),
            allow_fallback,
        }
    }

    fn rows_url(offset: u32, length: u32) -> String {
        format!(
            "{DATASETS_SERVER}/rows?dataset={DATASET}&config=default&split=train&offset={offset}&length={length}"
        )
    }

    fn fallback_payload() -> Value {
        json!({
            "fallback": true,
            "top_model": "estimated",
            "top_score": FALLBACK_TOP_SCORE,
        })
    }
}

#[async_trait]
impl MetricConnector for HuggingFaceConnector {
    fn source(&self) -> &'static str {
        SOURCE
    }

    async fn fetch(&self, _config: &ConnectorConfig) -> FetchResult {
        let anchor = Regex::new(r">([^<]+)</a>").expect("static regex");
        let mut models: Vec<(String, f64)> = Vec::new();
        let mut transport_error: Option<String> = None;

        for &offset in SAMPLE_OFFSETS {
            let resp = match self
                .client
                .get(Self::rows_url(offset, BATCH_SIZE))
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    transport_error = Some(e.to_string());
                    continue;
                }
            };
            if !resp.status().is_success() {
                continue;
            }
            let data: Value = match resp.json().await {
                Ok(json) => json,
                Err(_) => continue,
            };

            let rows = match data["rows"].as_array() {
                Some(rows) => rows,
                None => continue,
            };
            for row_data in rows {
                let row = &row_data["row"];
                let model_html = row["Model"].as_str().unwrap_or("");
                let name = anchor
                    .captures(model_html)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_else(|| model_html.to_string());
                let score = row["Average \u{2b06}\u{fe0f}"].as_f64().unwrap_or(0.0);
                if score > 0.0 && !name.is_empty() {
                    models.push((name, score));
                }
            }
        }

        if models.is_empty() {
            if self.allow_fallback {
                warn!("HuggingFace leaderboard unreachable, substituting fallback estimate");
                return FetchResult::ok(SOURCE, Self::fallback_payload());
            }
            return FetchResult::err(
                SOURCE,
                transport_error
                    .unwrap_or_else(|| "no leaderboard data found in HuggingFace dataset".into()),
            );
        }

        models.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        let top: Vec<Value> = models
            .iter()
            .take(10)
            .map(|(name, score)| json!({ "name": name, "score": score }))
            .collect();

        FetchResult::ok(
            SOURCE,
            json!({
                "top_models": top,
                "top_model": models[0].0,
                "top_score": models[0].1,
                "sample_size": models.len(),
            }),
        )
    }

    /// One observation: the top average score, dated today. Fallback
    /// payloads (tagged `"fallback": true`) normalize the same way.
    fn normalize(&self, config: &ConnectorConfig, raw: &Value) -> Vec<Observation> {
        let top_score = match raw["top_score"].as_f64() {
            Some(s) => s,
            None => return Vec::new(),
        };

        vec![Observation {
            metric_id: config.metric_id.clone(),
            obs_date: Utc::now().format("%Y-%m-%d").to_string(),
            value: apply_multiplier(top_score, config),
            unit: config.unit.clone(),
            source: SOURCE.to_string(),
            retrieved_at: Utc::now(),
        }]
    }

    async fn health_check(&self) -> bool {
        self.client
            .get(Self::rows_url(0, 1))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map(|resp| resp.status().is_success())
            .unwrap_or(false)
    }
}
