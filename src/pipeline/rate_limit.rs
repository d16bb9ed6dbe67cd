//! Per-source pacing between consecutive calls.
//!
//! The pipeline runs one worker per source, so pacing is a plain sleep
//! between calls, sized to the strictest published budget for that source.
//! Jitter keeps request timing from looking mechanical to WAFs.

use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;

use crate::connectors::SourceKind;

/// Sleep the interval appropriate for `source` before the next call.
pub async fn pace(source: SourceKind) {
    let millis = match source {
        // CoinGecko free tier allows 10-30 calls/minute.
        SourceKind::CoinGecko => {
            let mut rng = rand::thread_rng();
            rng.gen_range(2500..3500)
        }
        // FRED tolerates bursts poorly; jitter avoids WAF tripwires.
        SourceKind::Fred => {
            let mut rng = rand::thread_rng();
            rng.gen_range(1500..3000)
        }
        SourceKind::HuggingFace | SourceKind::VastAi => 1000,
        _ => 100,
    };
    sleep(Duration::from_millis(millis)).await;
}

/// Feed sources share one modest interval; both HN APIs are generous.
pub async fn pace_feed() {
    sleep(Duration::from_millis(250)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    // start_paused makes sleeps resolve instantly against a virtual clock.
    #[tokio::test(start_paused = true)]
    async fn default_interval_is_short() {
        let start = Instant::now();
        pace(SourceKind::Ecb).await;
        assert!(start.elapsed() >= Duration::from_millis(100));
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn coingecko_interval_respects_budget() {
        let start = Instant::now();
        pace(SourceKind::CoinGecko).await;
        assert!(start.elapsed() >= Duration::from_millis(2500));
    }
}
