//! macrodeck: connector and normalization core for a static macro
//! dashboard.
//!
//! Heterogeneous public APIs (statistical agencies, central banks, market
//! and crypto feeds, news aggregators) are fetched and normalized into two
//! uniform shapes, [`models::Observation`] and [`models::Story`]. The
//! transform layer derives period-over-period series and sparklines from
//! observations; the pipeline runs one paced worker per source.

pub mod config;
pub mod connectors;
pub mod models;
pub mod pipeline;
pub mod transforms;

pub use connectors::{
    ConnectorConfig, FeedConfig, FeedConnector, FeedKind, FetchResult, MetricConnector, SourceKind,
};
pub use models::{MetricMeta, Observation, Story};
pub use pipeline::{Credentials, FeedOutcome, MetricOutcome};
