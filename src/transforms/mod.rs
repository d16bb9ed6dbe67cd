//! Derived-series transforms over normalized observations.
//!
//! Pure functions: no network, no storage. Input lists are descending by
//! date, the convention every connector's `normalize` establishes.

use std::collections::HashMap;

use chrono::Utc;

use crate::connectors::round_to;
use crate::models::{MetricMeta, Observation};

pub mod sparkline;

/// Year-over-year percent change. Requires at least 13 points.
pub fn calculate_yoy_percent(observations: &[Observation]) -> Vec<Observation> {
    period_over_period(observations, 12, 13)
}

/// Quarter-over-quarter percent change. Requires at least 5 points.
pub fn calculate_qoq_percent(observations: &[Observation]) -> Vec<Observation> {
    period_over_period(observations, 3, 5)
}

/// For each observation, look up the value dated exactly `months_back`
/// months earlier in a date map built from the same list. Points with no
/// prior date, or a zero prior value, are omitted. No interpolation, no
/// nearest-date fallback.
fn period_over_period(
    observations: &[Observation],
    months_back: u32,
    min_points: usize,
) -> Vec<Observation> {
    if observations.len() < min_points {
        return Vec::new();
    }

    let by_date: HashMap<&str, f64> = observations
        .iter()
        .map(|o| (o.obs_date.as_str(), o.value))
        .collect();

    let mut derived = Vec::new();
    for obs in observations {
        let prior_date = match shift_months_back(&obs.obs_date, months_back) {
            Some(d) => d,
            None => continue,
        };
        let prior = match by_date.get(prior_date.as_str()) {
            Some(&p) if p != 0.0 => p,
            _ => continue,
        };

        derived.push(Observation {
            metric_id: obs.metric_id.clone(),
            obs_date: obs.obs_date.clone(),
            value: round_to((obs.value - prior) / prior * 100.0, 2),
            unit: Some("%".to_string()),
            source: obs.source.clone(),
            retrieved_at: obs.retrieved_at,
        });
    }
    derived
}

/// Shift an ISO `YYYY-MM-DD` date back by whole months, keeping the day
/// component. Returns `None` when the date does not parse.
fn shift_months_back(date: &str, months: u32) -> Option<String> {
    let (year_str, rest) = date.split_once('-')?;
    let (month_str, day_str) = rest.split_once('-')?;
    let mut year: i32 = year_str.parse().ok()?;
    let month: i32 = month_str.parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }

    let mut month = month - months as i32;
    while month <= 0 {
        month += 12;
        year -= 1;
    }
    Some(format!("{year:04}-{month:02}-{day_str}"))
}

/// Absolute and percent change between two scalars.
///
/// `previous == None` yields `(None, None)`; `previous == 0` yields a
/// defined absolute and an undefined percent. Absolute is rounded to 4
/// decimals, percent to 2.
pub fn calculate_change(current: f64, previous: Option<f64>) -> (Option<f64>, Option<f64>) {
    let previous = match previous {
        Some(p) => p,
        None => return (None, None),
    };

    let absolute = round_to(current - previous, 4);
    if previous == 0.0 {
        (Some(absolute), None)
    } else {
        let percent = round_to((current - previous) / previous * 100.0, 2);
        (Some(absolute), Some(percent))
    }
}

impl MetricMeta {
    /// Fold a fresh reading into the latest-state view: shifts the value
    /// pair, recomputes the change fields and stamps `last_updated`.
    pub fn refresh(&mut self, current: f64, previous: Option<f64>) {
        let (change, change_percent) = calculate_change(current, previous);
        self.previous_value = previous;
        self.last_value = Some(current);
        self.change = change;
        self.change_percent = change_percent;
        self.last_updated = Some(Utc::now());
    }
}
