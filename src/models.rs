use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One normalized, time-stamped data point for a metric.
///
/// `obs_date` is always an ISO `YYYY-MM-DD` string; sub-daily granularities
/// (monthly, quarterly, annual, fiscal-year) are pinned to the first day of
/// the period by the producing connector. `value` already has the configured
/// unit multiplier applied and is rounded to the configured decimals.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Observation {
    pub metric_id: String,
    pub obs_date: String,
    pub value: f64,
    pub unit: Option<String>,
    pub source: String,
    pub retrieved_at: DateTime<Utc>,
}

/// One normalized feed item (news/discussion post).
///
/// `id` is the source-native identifier and is stable across refetches of the
/// same underlying item; the storage collaborator upserts on it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Story {
    pub id: i64,
    pub title: String,
    pub url: Option<String>,
    pub score: i64,
    pub comments: i64,
    pub author: String,
    pub posted_at: DateTime<Utc>,
    pub source: String,
    pub feed_id: String,
    pub retrieved_at: DateTime<Utc>,
}

/// Denormalized latest-state view of a metric. Owned by the storage
/// collaborator; the transform layer refreshes the change fields.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct MetricMeta {
    pub id: String,
    pub name: String,
    pub source: String,
    pub frequency: String,
    pub unit: Option<String>,
    pub last_value: Option<f64>,
    pub last_updated: Option<DateTime<Utc>>,
    pub previous_value: Option<f64>,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
}
