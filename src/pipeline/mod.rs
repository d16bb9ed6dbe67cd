//! Fetch orchestration.
//!
//! One worker per source: sources run concurrently, calls within a source
//! run sequentially behind the per-source pacing interval, so each API's
//! rate budget is respected regardless of how many metrics it backs. A
//! failed fetch is captured in the per-metric outcome and never stops the
//! run; the consumer renders a placeholder for empty outcomes.

use std::collections::HashMap;
use std::env;

use anyhow::{anyhow, Result};
use tracing::{debug, warn};

use crate::config::{FeedDef, MetricDef};
use crate::connectors::{
    coingecko::CoinGeckoConnector,
    dbnomics::DbnomicsConnector,
    ecb::EcbConnector,
    estat::EstatDashboardConnector,
    fred::FredConnector,
    hackernews::{HnAlgoliaConnector, HnFirebaseConnector},
    huggingface::HuggingFaceConnector,
    imf::ImfConnector,
    oecd::OecdConnector,
    vastai::VastAiConnector,
    worldbank::WorldBankConnector,
    yahoo::YahooFinanceConnector,
    ConnectorConfig, FeedConfig, FeedConnector, FeedKind, MetricConnector, SourceKind,
};
use crate::models::{Observation, Story};

pub mod rate_limit;

/// API keys, resolved once at the composition root.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub fred_api_key: Option<String>,
    pub vastai_api_key: Option<String>,
}

impl Credentials {
    /// Reads `FRED_API_KEY` / `VASTAI_API_KEY`, loading `.env` first if
    /// present. Missing keys stay `None`; only the FRED connector treats
    /// that as an error, at construction time.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            fred_api_key: env::var("FRED_API_KEY").ok(),
            vastai_api_key: env::var("VASTAI_API_KEY").ok(),
        }
    }
}

/// Result of one metric's fetch + normalize cycle.
#[derive(Debug, Clone)]
pub struct MetricOutcome {
    pub metric_id: String,
    pub observations: Vec<Observation>,
    pub error: Option<String>,
}

/// Result of one feed's fetch + normalize cycle.
#[derive(Debug, Clone)]
pub struct FeedOutcome {
    pub feed_id: String,
    pub stories: Vec<Story>,
    pub error: Option<String>,
}

/// Instantiate the connector for a source tag. Approximate-fallback
/// sources (HuggingFace, Vast.ai) run with fallback enabled here; the
/// dashboard prefers an estimate over a hole.
pub fn connector_for(kind: SourceKind, creds: &Credentials) -> Result<Box<dyn MetricConnector>> {
    Ok(match kind {
        SourceKind::Fred => {
            let key = creds
                .fred_api_key
                .clone()
                .ok_or_else(|| anyhow!("FRED_API_KEY not configured"))?;
            Box::new(FredConnector::new(key))
        }
        SourceKind::Ecb => Box::new(EcbConnector::new()),
        SourceKind::WorldBank => Box::new(WorldBankConnector::new()),
        SourceKind::Imf => Box::new(ImfConnector::new()),
        SourceKind::Oecd => Box::new(OecdConnector::new()),
        SourceKind::EstatDashboard => Box::new(EstatDashboardConnector::new()),
        SourceKind::Dbnomics => Box::new(DbnomicsConnector::new()),
        SourceKind::CoinGecko => Box::new(CoinGeckoConnector::new()),
        SourceKind::Yahoo => Box::new(YahooFinanceConnector::new()),
        SourceKind::HuggingFace => Box::new(HuggingFaceConnector::new(true)),
        SourceKind::VastAi => Box::new(VastAiConnector::new(creds.vastai_api_key.clone(), true)),
    })
}

pub fn feed_connector_for(kind: FeedKind) -> Box<dyn FeedConnector> {
    match kind {
        FeedKind::HnFirebase => Box::new(HnFirebaseConnector::new()),
        FeedKind::HnAlgolia => Box::new(HnAlgoliaConnector::new()),
    }
}

/// Fetch and normalize every configured metric. One outcome per input
/// definition; outcome order is unspecified.
pub async fn run_metrics(metrics: &[MetricDef], creds: &Credentials) -> Vec<MetricOutcome> {
    let mut groups: HashMap<SourceKind, Vec<ConnectorConfig>> = HashMap::new();
    let mut outcomes = Vec::with_capacity(metrics.len());

    for def in metrics {
        match def.source_kind() {
            Some(kind) => groups.entry(kind).or_default().push(def.connector_config()),
            None => outcomes.push(MetricOutcome {
                metric_id: def.id.clone(),
                observations: Vec::new(),
                error: Some(format!("unknown source tag: {}", def.source)),
            }),
        }
    }

    let mut handles = Vec::new();
    for (kind, configs) in groups {
        match connector_for(kind, creds) {
            Ok(connector) => {
                handles.push(tokio::spawn(run_metric_source(kind, connector, configs)));
            }
            Err(e) => {
                let message = e.to_string();
                outcomes.extend(configs.into_iter().map(|config| MetricOutcome {
                    metric_id: config.metric_id,
                    observations: Vec::new(),
                    error: Some(message.clone()),
                }));
            }
        }
    }

    for handle in handles {
        match handle.await {
            Ok(batch) => outcomes.extend(batch),
            Err(e) => warn!(error = %e, "metric worker panicked"),
        }
    }
    outcomes
}

async fn run_metric_source(
    kind: SourceKind,
    connector: Box<dyn MetricConnector>,
    configs: Vec<ConnectorConfig>,
) -> Vec<MetricOutcome> {
    let mut outcomes = Vec::with_capacity(configs.len());
    for (i, config) in configs.iter().enumerate() {
        if i > 0 {
            rate_limit::pace(kind).await;
        }
        debug!(source = kind.as_str(), metric = %config.metric_id, "fetching");

        let result = connector.fetch(config).await;
        if result.success {
            let observations = connector.normalize(config, &result.data);
            debug!(
                source = kind.as_str(),
                metric = %config.metric_id,
                points = observations.len(),
                "normalized"
            );
            outcomes.push(MetricOutcome {
                metric_id: config.metric_id.clone(),
                observations,
                error: None,
            });
        } else {
            warn!(
                source = kind.as_str(),
                metric = %config.metric_id,
                error = result.error.as_deref().unwrap_or("unknown"),
                "fetch failed"
            );
            outcomes.push(MetricOutcome {
                metric_id: config.metric_id.clone(),
                observations: Vec::new(),
                error: result.error,
            });
        }
    }
    outcomes
}

/// Fetch and normalize every configured feed.
pub async fn run_feeds(feeds: &[FeedDef]) -> Vec<FeedOutcome> {
    let mut groups: HashMap<FeedKind, Vec<FeedConfig>> = HashMap::new();
    let mut outcomes = Vec::with_capacity(feeds.len());

    for def in feeds {
        match def.feed_kind() {
            Some(kind) => groups.entry(kind).or_default().push(def.feed_config()),
            None => outcomes.push(FeedOutcome {
                feed_id: def.id.clone(),
                stories: Vec::new(),
                error: Some(format!("unknown feed source tag: {}", def.source)),
            }),
        }
    }

    let mut handles = Vec::new();
    for (kind, configs) in groups {
        let connector = feed_connector_for(kind);
        handles.push(tokio::spawn(run_feed_source(connector, configs)));
    }

    for handle in handles {
        match handle.await {
            Ok(batch) => outcomes.extend(batch),
            Err(e) => warn!(error = %e, "feed worker panicked"),
        }
    }
    outcomes
}

async fn run_feed_source(
    connector: Box<dyn FeedConnector>,
    configs: Vec<FeedConfig>,
) -> Vec<FeedOutcome> {
    let mut outcomes = Vec::with_capacity(configs.len());
    for (i, config) in configs.iter().enumerate() {
        if i > 0 {
            rate_limit::pace_feed().await;
        }
        debug!(source = connector.source(), feed = %config.id, "fetching");

        let result = connector.fetch(config).await;
        if result.success {
            let stories = connector.normalize(config, &result.data);
            outcomes.push(FeedOutcome {
                feed_id: config.id.clone(),
                stories,
                error: None,
            });
        } else {
            warn!(
                source = connector.source(),
                feed = %config.id,
                error = result.error.as_deref().unwrap_or("unknown"),
                "fetch failed"
            );
            outcomes.push(FeedOutcome {
                feed_id: config.id.clone(),
                stories: Vec::new(),
                error: result.error,
            });
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(id: &str, source: &str) -> MetricDef {
        let raw = format!(
            "[[metrics]]\nid = \"{id}\"\nname = \"{id}\"\nsource = \"{source}\"\nfrequency = \"monthly\"\n"
        );
        crate::config::parse(&raw).unwrap().metrics.remove(0)
    }

    #[tokio::test]
    async fn unknown_source_is_a_per_metric_error() {
        let outcomes = run_metrics(&[metric("x.y", "bloomberg")], &Credentials::default()).await;
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].error.as_deref().unwrap().contains("bloomberg"));
        assert!(outcomes[0].observations.is_empty());
    }

    #[tokio::test]
    async fn missing_fred_key_is_a_per_metric_error() {
        let outcomes = run_metrics(&[metric("us.gdp", "fred")], &Credentials::default()).await;
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0]
            .error
            .as_deref()
            .unwrap()
            .contains("FRED_API_KEY"));
    }

    #[test]
    fn every_source_kind_constructs_given_credentials() {
        let creds = Credentials {
            fred_api_key: Some("test-key".into()),
            vastai_api_key: None,
        };
        for kind in [
            SourceKind::Fred,
            SourceKind::Ecb,
            SourceKind::WorldBank,
            SourceKind::Imf,
            SourceKind::Oecd,
            SourceKind::EstatDashboard,
            SourceKind::Dbnomics,
            SourceKind::CoinGecko,
            SourceKind::Yahoo,
            SourceKind::HuggingFace,
            SourceKind::VastAi,
        ] {
            let connector = connector_for(kind, &creds).unwrap();
            assert_eq!(connector.source(), kind.as_str());
        }
    }
}
