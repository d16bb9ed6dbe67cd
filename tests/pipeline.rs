//! End-to-end pipeline behavior without touching the network.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use macrodeck::config;
use macrodeck::connectors::{ConnectorConfig, FetchResult, MetricConnector};
use macrodeck::models::Observation;
use macrodeck::pipeline::{run_metrics, Credentials};
use macrodeck::transforms::{calculate_yoy_percent, sparkline};

/// A connector that serves a canned payload. Stands in for any real source
/// behind the same trait the pipeline drives.
struct MockConnector {
    result: FetchResult,
}

#[async_trait]
impl MetricConnector for MockConnector {
    fn source(&self) -> &'static str {
        "mock"
    }

    async fn fetch(&self, _config: &ConnectorConfig) -> FetchResult {
        self.result.clone()
    }

    fn normalize(&self, config: &ConnectorConfig, raw: &Value) -> Vec<Observation> {
        raw.as_array()
            .map(|points| {
                points
                    .iter()
                    .filter_map(|p| {
                        Some(Observation {
                            metric_id: config.metric_id.clone(),
                            obs_date: p["date"].as_str()?.to_string(),
                            value: p["value"].as_f64()?,
                            unit: config.unit.clone(),
                            source: "mock".into(),
                            retrieved_at: Utc::now(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn health_check(&self) -> bool {
        true
    }
}

fn mock_config() -> ConnectorConfig {
    ConnectorConfig {
        metric_id: "mock.series".into(),
        name: "Mock Series".into(),
        frequency: "monthly".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn successful_fetch_flows_into_normalize() {
    let connector = MockConnector {
        result: FetchResult::ok(
            "mock",
            json!([
                { "date": "2024-02-01", "value": 102.0 },
                { "date": "2024-01-01", "value": 100.0 },
                { "date": "2023-12-01", "value": "not a number" }
            ]),
        ),
    };
    let config = mock_config();

    let result = connector.fetch(&config).await;
    assert!(result.success);

    let observations = connector.normalize(&config, &result.data);
    assert_eq!(observations.len(), 2);
    assert_eq!(observations[0].obs_date, "2024-02-01");
    assert_eq!(observations[1].value, 100.0);
}

#[tokio::test]
async fn failed_fetch_carries_an_error_not_a_panic() {
    let connector = MockConnector {
        result: FetchResult::err("mock", "connection refused"),
    };

    let result = connector.fetch(&mock_config()).await;
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("connection refused"));
    assert!(result.data.is_null());
}

#[tokio::test]
async fn config_errors_surface_per_metric_without_network() {
    let app = config::parse(
        r#"
[[metrics]]
id = "us.gdp"
name = "US GDP"
source = "fred"
frequency = "quarterly"
series_id = "GDP"

[[metrics]]
id = "x.y"
name = "Mystery"
source = "bloomberg"
frequency = "daily"
"#,
    )
    .unwrap();

    // No FRED key and an unknown tag: both become error outcomes, the run
    // itself succeeds.
    let outcomes = run_metrics(&app.metrics, &Credentials::default()).await;
    assert_eq!(outcomes.len(), 2);
    for outcome in &outcomes {
        assert!(outcome.observations.is_empty());
        assert!(outcome.error.is_some());
    }
}

#[tokio::test]
async fn observations_flow_through_transforms_to_sparkline() {
    // 13 descending monthly points rising over time, 2024-01 on top.
    let points: Vec<Value> = (0..13)
        .map(|i| {
            let (year, month) = if i == 0 {
                (2024, 1)
            } else {
                (2023, 13 - i)
            };
            let value = if i == 0 {
                120.0
            } else {
                100.0 + (13 - i) as f64
            };
            json!({ "date": format!("{year:04}-{month:02}-01"), "value": value })
        })
        .collect();

    let connector = MockConnector {
        result: FetchResult::ok("mock", Value::Array(points)),
    };
    let config = mock_config();

    let result = connector.fetch(&config).await;
    let observations = connector.normalize(&config, &result.data);
    assert_eq!(observations.len(), 13);

    let yoy = calculate_yoy_percent(&observations);
    assert_eq!(yoy.len(), 1);
    assert_eq!(yoy[0].obs_date, "2024-01-01");
    assert_eq!(yoy[0].unit.as_deref(), Some("%"));

    let data = sparkline::prepare_sparkline_data(&observations, 12);
    assert_eq!(data.len(), 12);
    assert!(data[0] < data[data.len() - 1]);

    let line = sparkline::block_sparkline(&data, 12).unwrap();
    assert_eq!(line.chars().count(), 12);
}
