//! Metric and feed definitions, loaded from a TOML file.
//!
//! The file carries `[[metrics]]` and `[[feeds]]` tables; each entry names
//! a source tag plus whatever addressing fields that source needs. The
//! definitions convert into the per-call [`ConnectorConfig`] /
//! [`FeedConfig`] envelopes the connectors consume.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::connectors::{ConnectorConfig, FeedConfig, FeedKind, SourceKind};

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub metrics: Vec<MetricDef>,
    #[serde(default)]
    pub feeds: Vec<FeedDef>,
}

/// One `[[metrics]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricDef {
    pub id: String,
    pub name: String,
    pub source: String,
    pub frequency: String,
    pub series_id: Option<String>,
    pub dataflow: Option<String>,
    pub series_key: Option<String>,
    pub indicator: Option<String>,
    pub country: Option<String>,
    pub indicator_code: Option<String>,
    pub unit: Option<String>,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_decimals")]
    pub decimals: u32,
}

/// One `[[feeds]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedDef {
    pub id: String,
    pub name: String,
    pub source: String,
    pub endpoint: Option<String>,
    pub query: Option<String>,
    pub tags: Option<String>,
    pub time_range: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_multiplier() -> f64 {
    1.0
}

fn default_decimals() -> u32 {
    2
}

fn default_limit() -> usize {
    20
}

impl MetricDef {
    pub fn source_kind(&self) -> Option<SourceKind> {
        SourceKind::parse(&self.source)
    }

    pub fn connector_config(&self) -> ConnectorConfig {
        ConnectorConfig {
            metric_id: self.id.clone(),
            name: self.name.clone(),
            frequency: self.frequency.clone(),
            series_id: self.series_id.clone(),
            dataflow: self.dataflow.clone(),
            series_key: self.series_key.clone(),
            indicator: self.indicator.clone(),
            country: self.country.clone(),
            indicator_code: self.indicator_code.clone(),
            unit: self.unit.clone(),
            multiplier: self.multiplier,
            decimals: self.decimals,
        }
    }
}

impl FeedDef {
    pub fn feed_kind(&self) -> Option<FeedKind> {
        FeedKind::parse(&self.source)
    }

    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig {
            id: self.id.clone(),
            name: self.name.clone(),
            endpoint: self.endpoint.clone(),
            query: self.query.clone(),
            tags: self.tags.clone(),
            time_range: self.time_range.clone(),
            limit: self.limit,
        }
    }
}

pub fn load(path: impl AsRef<Path>) -> Result<AppConfig> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    parse(&raw).with_context(|| format!("parsing config file {}", path.display()))
}

pub fn parse(raw: &str) -> Result<AppConfig> {
    Ok(toml::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[[metrics]]
id = "us.gdp"
name = "US GDP"
source = "fred"
frequency = "quarterly"
series_id = "GDP"
unit = "$T"
multiplier = 0.001
decimals = 1

[[metrics]]
id = "jp.cpi"
name = "Japan CPI"
source = "estat_dashboard"
frequency = "monthly"
indicator_code = "0703000501010010000"

[[feeds]]
id = "hn_ai"
name = "HN AI News"
source = "hn_algolia"
query = "artificial intelligence"
time_range = "week"
limit = 15
"#;

    #[test]
    fn parses_metrics_and_feeds() {
        let config = parse(SAMPLE).unwrap();
        assert_eq!(config.metrics.len(), 2);
        assert_eq!(config.feeds.len(), 1);

        let gdp = &config.metrics[0];
        assert_eq!(gdp.source_kind(), Some(SourceKind::Fred));
        let cc = gdp.connector_config();
        assert_eq!(cc.metric_id, "us.gdp");
        assert_eq!(cc.series_id.as_deref(), Some("GDP"));
        assert_eq!(cc.multiplier, 0.001);
        assert_eq!(cc.decimals, 1);
    }

    #[test]
    fn defaults_apply_when_omitted() {
        let config = parse(SAMPLE).unwrap();
        let cpi = config.metrics[1].connector_config();
        assert_eq!(cpi.multiplier, 1.0);
        assert_eq!(cpi.decimals, 2);
        assert_eq!(cpi.indicator_code.as_deref(), Some("0703000501010010000"));
    }

    #[test]
    fn feed_defaults_and_kind() {
        let config = parse(SAMPLE).unwrap();
        let feed = &config.feeds[0];
        assert_eq!(feed.feed_kind(), Some(FeedKind::HnAlgolia));
        let fc = feed.feed_config();
        assert_eq!(fc.limit, 15);
        assert_eq!(fc.time_range.as_deref(), Some("week"));
    }

    #[test]
    fn unknown_source_tag_yields_none() {
        let config = parse(
            r#"
[[metrics]]
id = "x"
name = "X"
source = "bloomberg"
frequency = "daily"
"#,
        )
        .unwrap();
        assert_eq!(config.metrics[0].source_kind(), None);
    }

    #[test]
    fn empty_document_is_valid() {
        let config = parse("").unwrap();
        assert!(config.metrics.is_empty());
        assert!(config.feeds.is_empty());
    }
}
