use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::models::{Observation, Story};

pub mod period;

pub mod coingecko;
pub mod dbnomics;
pub mod ecb;
pub mod estat;
pub mod fred;
pub mod hackernews;
pub mod huggingface;
pub mod imf;
pub mod oecd;
pub mod vastai;
pub mod worldbank;
pub mod yahoo;

/// Timeout for a data fetch round-trip.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for a health-check probe. Probes are meant to be cheap.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Closed set of supported time-series sources. The set is fixed at build
/// time; configuration selects a variant by tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Fred,
    Ecb,
    WorldBank,
    Imf,
    Oecd,
    EstatDashboard,
    Dbnomics,
    CoinGecko,
    Yahoo,
    HuggingFace,
    VastAi,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Fred => "fred",
            SourceKind::Ecb => "ecb",
            SourceKind::WorldBank => "worldbank",
            SourceKind::Imf => "imf",
            SourceKind::Oecd => "oecd",
            SourceKind::EstatDashboard => "estat_dashboard",
            SourceKind::Dbnomics => "dbnomics",
            SourceKind::CoinGecko => "coingecko",
            SourceKind::Yahoo => "yahoo",
            SourceKind::HuggingFace => "huggingface",
            SourceKind::VastAi => "vastai",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "fred" => Some(SourceKind::Fred),
            "ecb" => Some(SourceKind::Ecb),
            "worldbank" => Some(SourceKind::WorldBank),
            "imf" => Some(SourceKind::Imf),
            "oecd" => Some(SourceKind::Oecd),
            "estat_dashboard" => Some(SourceKind::EstatDashboard),
            "dbnomics" => Some(SourceKind::Dbnomics),
            "coingecko" => Some(SourceKind::CoinGecko),
            "yahoo" => Some(SourceKind::Yahoo),
            "huggingface" => Some(SourceKind::HuggingFace),
            "vastai" => Some(SourceKind::VastAi),
            _ => None,
        }
    }
}

/// Closed set of supported feed sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    HnFirebase,
    HnAlgolia,
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::HnFirebase => "hn_firebase",
            FeedKind::HnAlgolia => "hn_algolia",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "hn_firebase" => Some(FeedKind::HnFirebase),
            "hn_algolia" => Some(FeedKind::HnAlgolia),
            _ => None,
        }
    }
}

/// Per-call request description for a metric fetch. Built fresh from
/// configuration for every invocation; connectors read it, never mutate it.
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    pub metric_id: String,
    pub name: String,
    pub frequency: String,
    /// Source-native series identifier (FRED series, DBnomics path, coin id,
    /// Yahoo symbol, Vast.ai GPU model — whichever the source needs).
    pub series_id: Option<String>,
    pub dataflow: Option<String>,
    pub series_key: Option<String>,
    pub indicator: Option<String>,
    pub country: Option<String>,
    pub indicator_code: Option<String>,
    pub unit: Option<String>,
    pub multiplier: f64,
    pub decimals: u32,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            metric_id: String::new(),
            name: String::new(),
            frequency: String::new(),
            series_id: None,
            dataflow: None,
            series_key: None,
            indicator: None,
            country: None,
            indicator_code: None,
            unit: None,
            multiplier: 1.0,
            decimals: 2,
        }
    }
}

/// Per-call request description for a feed fetch.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub id: String,
    pub name: String,
    /// Index endpoint for HN Firebase (topstories, beststories, ...).
    pub endpoint: Option<String>,
    /// Search query for HN Algolia.
    pub query: Option<String>,
    pub tags: Option<String>,
    /// day | week | month | year; switches Algolia to search_by_date.
    pub time_range: Option<String>,
    pub limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            endpoint: None,
            query: None,
            tags: None,
            time_range: None,
            limit: 20,
        }
    }
}

/// Discriminated outcome of a fetch call. `data` is an opaque source-specific
/// payload; only the producing connector's `normalize` may interpret it.
/// Constructed once per fetch, consumed immediately, never persisted.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub success: bool,
    pub data: Value,
    pub error: Option<String>,
    pub source: &'static str,
}

impl FetchResult {
    pub fn ok(source: &'static str, data: Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
            source,
        }
    }

    pub fn err(source: &'static str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            error: Some(message.into()),
            source,
        }
    }
}

/// The fetch + normalize + health-check unit for one time-series source.
///
/// `fetch` never returns `Err`: missing config fields, transport errors and
/// unexpected envelopes all fold into `FetchResult { success: false, .. }`.
/// `normalize` is pure and best-effort: malformed or missing individual
/// points are dropped, never an error for the whole batch.
#[async_trait]
pub trait MetricConnector: Send + Sync {
    fn source(&self) -> &'static str;
    async fn fetch(&self, config: &ConnectorConfig) -> FetchResult;
    fn normalize(&self, config: &ConnectorConfig, raw: &Value) -> Vec<Observation>;
    async fn health_check(&self) -> bool;
}

/// Same contract as [`MetricConnector`], producing stories instead of
/// observations.
#[async_trait]
pub trait FeedConnector: Send + Sync {
    fn source(&self) -> &'static str;
    async fn fetch(&self, config: &FeedConfig) -> FetchResult;
    fn normalize(&self, config: &FeedConfig, raw: &Value) -> Vec<Story>;
    async fn health_check(&self) -> bool;
}

/// Round to `decimals` places, half away from zero (`f64::round` semantics).
///
/// This is the single rounding mode for every displayed value in the crate;
/// all connectors funnel through it after applying the unit multiplier.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Scale a raw value by the config multiplier and round to the configured
/// decimals.
pub fn apply_multiplier(raw: f64, config: &ConnectorConfig) -> f64 {
    round_to(raw * config.multiplier, config.decimals)
}

/// Shared reqwest client with the fetch timeout applied. Health probes
/// tighten the timeout per request.
pub fn http_client() -> Client {
    Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Client presenting a browser user agent, for sources that reject default
/// library agents (Yahoo Finance).
pub fn browser_client() -> Client {
    Client::builder()
        .timeout(FETCH_TIMEOUT)
        .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
        .build()
        .unwrap_or_else(|_| Client::new())
}
