//! Probe every connector's health endpoint and print a status table.
//!
//! Exit code is non-zero when any source is down, so this doubles as a
//! pre-deploy smoke check.

use macrodeck::connectors::{FeedKind, SourceKind};
use macrodeck::pipeline::{connector_for, feed_connector_for, Credentials};
use tracing::info;
use tracing_subscriber::EnvFilter;

const SOURCES: &[SourceKind] = &[
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
];

const FEEDS: &[FeedKind] = &[FeedKind::HnFirebase, FeedKind::HnAlgolia];

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let creds = Credentials::from_env();
    let mut failures = 0usize;

    for &kind in SOURCES {
        match connector_for(kind, &creds) {
            Ok(connector) => {
                let healthy = connector.health_check().await;
                info!(source = kind.as_str(), healthy, "probe");
                println!(
                    "{:<16} {}",
                    kind.as_str(),
                    if healthy { "ok" } else { "DOWN" }
                );
                if !healthy {
                    failures += 1;
                }
            }
            Err(e) => {
                println!("{:<16} SKIPPED ({e})", kind.as_str());
            }
        }
    }

    for &kind in FEEDS {
        let connector = feed_connector_for(kind);
        let healthy = connector.health_check().await;
        info!(source = kind.as_str(), healthy, "probe");
        println!(
            "{:<16} {}",
            kind.as_str(),
            if healthy { "ok" } else { "DOWN" }
        );
        if !healthy {
            failures += 1;
        }
    }

    if failures > 0 {
        println!("{failures} source(s) down");
        std::process::exit(1);
    }
}
