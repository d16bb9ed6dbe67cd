//! Hacker News feed connectors.
//!
//! Two APIs over the same corpus: the official Firebase mirror (an index
//! call returning ranked story ids, then one call per id) and the Algolia
//! search API (a single query, optionally time-windowed). Both normalize
//! into [`Story`] records keyed by the HN item id.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::future::join_all;
use reqwest::Client;
use serde_json::Value;

use super::{http_client, FeedConfig, FeedConnector, FetchResult, PROBE_TIMEOUT};
use crate::models::Story;

const FIREBASE_BASE: &str = "https://hacker-news.firebaseio.com/v0";
const ALGOLIA_BASE: &str = "https://hn.algolia.com/api/v1";
const FIREBASE_SOURCE: &str = "hn_firebase";
const ALGOLIA_SOURCE: &str = "hn_algolia";

fn epoch_to_datetime(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .unwrap_or_else(|| Utc.timestamp_opt(0, 0).single().expect("epoch"))
}

/// Official HN Firebase API. The index endpoint (`topstories`,
/// `beststories`, ...) returns ranked ids; each story needs its own call.
/// Fan-out is bounded by `config.limit` and the index ranking is preserved.
pub struct HnFirebaseConnector {
    client: Client,
}

impl HnFirebaseConnector {
    pub fn new() -> Self {
        Self {
            client: http_client(),
        }
    }
}

impl Default for HnFirebaseConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedConnector for HnFirebaseConnector {
    fn source(&self) -> &'static str {
        FIREBASE_SOURCE
    }

    async fn fetch(&self, config: &FeedConfig) -> FetchResult {
        let endpoint = config.endpoint.as_deref().unwrap_or("topstories");
        let index_url = format!("{FIREBASE_BASE}/{endpoint}.json");

        let resp = match self.client.get(&index_url).send().await {
            Ok(resp) => resp,
            Err(e) => return FetchResult::err(FIREBASE_SOURCE, e.to_string()),
        };
        if !resp.status().is_success() {
            return FetchResult::err(
                FIREBASE_SOURCE,
                format!("HN Firebase index error: {}", resp.status()),
            );
        }
        let ids: Vec<i64> = match resp.json().await {
            Ok(ids) => ids,
            Err(e) => return FetchResult::err(FIREBASE_SOURCE, e.to_string()),
        };

        // One call per id, concurrently; join_all keeps the index order.
        let futures = ids.into_iter().take(config.limit).map(|id| {
            let client = self.client.clone();
            async move {
                let url = format!("{FIREBASE_BASE}/item/{id}.json");
                match client.get(&url).send().await {
                    Ok(resp) if resp.status().is_success() => {
                        resp.json::<Value>().await.ok().filter(|v| v.is_object())
                    }
                    _ => None,
                }
            }
        });

        let items: Vec<Value> = join_all(futures).await.into_iter().flatten().collect();
        FetchResult::ok(FIREBASE_SOURCE, Value::Array(items))
    }

    /// Missing title/url/score/comments normalize to ""/None/0/0; a record
    /// without an id is dropped.
    fn normalize(&self, config: &FeedConfig, raw: &Value) -> Vec<Story> {
        let items = match raw.as_array() {
            Some(items) => items,
            None => return Vec::new(),
        };

        let mut stories = Vec::new();
        for item in items {
            let id = match item["id"].as_i64() {
                Some(id) => id,
                None => continue,
            };

            stories.push(Story {
                id,
                title: item["title"].as_str().unwrap_or("").to_string(),
                url: item["url"].as_str().map(str::to_string),
                score: item["score"].as_i64().unwrap_or(0),
                comments: item["descendants"].as_i64().unwrap_or(0),
                author: item["by"].as_str().unwrap_or("").to_string(),
                posted_at: epoch_to_datetime(item["time"].as_i64().unwrap_or(0)),
                source: FIREBASE_SOURCE.to_string(),
                feed_id: config.id.clone(),
                retrieved_at: Utc::now(),
            });
        }
        stories
    }

    async fn health_check(&self) -> bool {
        self.client
            .get(format!("{FIREBASE_BASE}/topstories.json"))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map(|resp| resp.status().is_success())
            .unwrap_or(false)
    }
}

/// HN Algolia search API: one call per feed. A `time_range` switches to the
/// `search_by_date` endpoint with a `created_at_i` cutoff filter.
pub struct HnAlgoliaConnector {
    client: Client,
}

impl HnAlgoliaConnector {
    pub fn new() -> Self {
        Self {
            client: http_client(),
        }
    }

    fn range_seconds(range: &str) -> Option<i64> {
        match range {
            "day" => Some(86_400),
            "week" => Some(604_800),
            "month" => Some(2_592_000),
            "year" => Some(31_536_000),
            _ => None,
        }
    }
}

impl Default for HnAlgoliaConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedConnector for HnAlgoliaConnector {
    fn source(&self) -> &'static str {
        ALGOLIA_SOURCE
    }

    async fn fetch(&self, config: &FeedConfig) -> FetchResult {
        let query = match config.query.as_deref() {
            Some(q) if !q.is_empty() => q,
            _ => return FetchResult::err(ALGOLIA_SOURCE, "query required for HN Algolia connector"),
        };

        let window = config
            .time_range
            .as_deref()
            .and_then(Self::range_seconds);
        let endpoint = if window.is_some() {
            "search_by_date"
        } else {
            "search"
        };

        let url = format!("{ALGOLIA_BASE}/{endpoint}");
        let tags = config.tags.as_deref().unwrap_or("story");
        let limit = config.limit.to_string();
        let mut params = vec![
            ("query", query.to_string()),
            ("tags", tags.to_string()),
            ("hitsPerPage", limit),
        ];
        if let Some(secs) = window {
            let cutoff = Utc::now().timestamp() - secs;
            params.push(("numericFilters", format!("created_at_i>{cutoff}")));
        }

        let resp = match self.client.get(&url).query(&params).send().await {
            Ok(resp) => resp,
            Err(e) => return FetchResult::err(ALGOLIA_SOURCE, e.to_string()),
        };
        if !resp.status().is_success() {
            return FetchResult::err(
                ALGOLIA_SOURCE,
                format!("HN Algolia error: {}", resp.status()),
            );
        }

        let json: Value = match resp.json().await {
            Ok(json) => json,
            Err(e) => return FetchResult::err(ALGOLIA_SOURCE, e.to_string()),
        };

        match json.get("hits") {
            Some(hits) if hits.is_array() => FetchResult::ok(ALGOLIA_SOURCE, hits.clone()),
            _ => FetchResult::err(ALGOLIA_SOURCE, "unexpected HN Algolia response: no hits"),
        }
    }

    /// Hits carry the id as a string `objectID`; a hit whose id does not
    /// parse is dropped. `created_at` is RFC 3339 with a `created_at_i`
    /// epoch fallback.
    fn normalize(&self, config: &FeedConfig, raw: &Value) -> Vec<Story> {
        let hits = match raw.as_array() {
            Some(hits) => hits,
            None => return Vec::new(),
        };

        let mut stories = Vec::new();
        for hit in hits {
            let id = match hit["objectID"].as_str().and_then(|s| s.parse::<i64>().ok()) {
                Some(id) => id,
                None => continue,
            };
            let posted_at = hit["created_at"]
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc))
                .or_else(|| hit["created_at_i"].as_i64().map(epoch_to_datetime));
            let posted_at = match posted_at {
                Some(dt) => dt,
                None => continue,
            };

            stories.push(Story {
                id,
                title: hit["title"].as_str().unwrap_or("").to_string(),
                url: hit["url"].as_str().map(str::to_string),
                score: hit["points"].as_i64().unwrap_or(0),
                comments: hit["num_comments"].as_i64().unwrap_or(0),
                author: hit["author"].as_str().unwrap_or("").to_string(),
                posted_at,
                source: ALGOLIA_SOURCE.to_string(),
                feed_id: config.id.clone(),
                retrieved_at: Utc::now(),
            });
        }
        stories
    }

    async fn health_check(&self) -> bool {
        self.client
            .get(format!("{ALGOLIA_BASE}/search"))
            .query(&[("query", "test"), ("hitsPerPage", "1")])
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

    fn firebase_config() -> FeedConfig {
        FeedConfig {
            id: "hn_top".into(),
            name: "HN Top Stories".into(),
            endpoint: Some("topstories".into()),
            limit: 5,
            ..Default::default()
        }
    }

    fn algolia_config() -> FeedConfig {
        FeedConfig {
            id: "hn_ai".into(),
            name: "HN AI News".into(),
            query: Some("artificial intelligence".into()),
            tags: Some("story".into()),
            limit: 10,
            ..Default::default()
        }
    }

    #[test]
    fn firebase_normalize_full_record() {
        let connector = HnFirebaseConnector::new();
        let raw = json!([{
            "id": 12345,
            "type": "story",
            "title": "Test Story",
            "url": "https://example.com",
            "score": 100,
            "descendants": 50,
            "by": "testuser",
            "time": 1_700_000_000i64
        }]);

        let stories = connector.normalize(&firebase_config(), &raw);

        assert_eq!(stories.len(), 1);
        let story = &stories[0];
        assert_eq!(story.id, 12345);
        assert_eq!(story.title, "Test Story");
        assert_eq!(story.url.as_deref(), Some("https://example.com"));
        assert_eq!(story.score, 100);
        assert_eq!(story.comments, 50);
        assert_eq!(story.author, "testuser");
        assert_eq!(story.source, "hn_firebase");
        assert_eq!(story.feed_id, "hn_top");
    }

    #[test]
    fn firebase_normalize_defaults_missing_fields() {
        let connector = HnFirebaseConnector::new();
        let raw = json!([{ "id": 12345, "type": "story" }]);

        let stories = connector.normalize(&firebase_config(), &raw);

        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].title, "");
        assert_eq!(stories[0].url, None);
        assert_eq!(stories[0].score, 0);
        assert_eq!(stories[0].comments, 0);
    }

    #[test]
    fn firebase_normalize_drops_records_without_id() {
        let connector = HnFirebaseConnector::new();
        let raw = json!([
            { "title": "no id" },
            { "id": 7, "title": "ok" }
        ]);

        let stories = connector.normalize(&firebase_config(), &raw);
        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].id, 7);
    }

    #[tokio::test]
    async fn algolia_fetch_requires_query() {
        let connector = HnAlgoliaConnector::new();
        let mut config = algolia_config();
        config.query = None;

        let result = connector.fetch(&config).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("query required"));
    }

    #[test]
    fn algolia_time_range_selects_search_by_date() {
        assert_eq!(HnAlgoliaConnector::range_seconds("week"), Some(604_800));
        assert_eq!(HnAlgoliaConnector::range_seconds("day"), Some(86_400));
        assert_eq!(HnAlgoliaConnector::range_seconds("decade"), None);
    }

    #[test]
    fn algolia_normalize_hit() {
        let connector = HnAlgoliaConnector::new();
        let raw = json!([{
            "objectID": "12345",
            "title": "AI Breakthrough",
            "url": "https://example.com/ai",
            "points": 200,
            "num_comments": 100,
            "author": "aiuser",
            "created_at": "2024-01-15T10:30:00Z"
        }]);

        let stories = connector.normalize(&algolia_config(), &raw);

        assert_eq!(stories.len(), 1);
        let story = &stories[0];
        assert_eq!(story.id, 12345);
        assert_eq!(story.score, 200);
        assert_eq!(story.comments, 100);
        assert_eq!(story.source, "hn_algolia");
        assert_eq!(story.posted_at.format("%Y-%m-%d").to_string(), "2024-01-15");
    }

    #[test]
    fn algolia_normalize_drops_unparseable_object_ids() {
        let connector = HnAlgoliaConnector::new();
        let raw = json!([
            { "objectID": "not-a-number", "created_at": "2024-01-15T10:30:00Z" },
            { "objectID": "42", "created_at_i": 1_700_000_000i64 }
        ]);

        let stories = connector.normalize(&algolia_config(), &raw);
        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].id, 42);
    }
}
