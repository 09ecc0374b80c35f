//! Stake: best-price lookup for unlisted shares.
//!
//! Serves the [`stake_scout`] aggregator over HTTP. See [`server`] for the
//! endpoints and [`config`] for file and environment configuration.

pub mod config;
pub mod error;
pub mod server;

use std::sync::Arc;

use stake_scout::{Aggregator, render};

pub use config::{ServerConfig, StakeConfig};
pub use error::{Result, StakeError};
pub use server::QueryServer;

/// Build the production aggregator and start serving.
///
/// Pages render in a headless browser unless `[scout] renderer = "http"`;
/// with `http_fallback` set, an unreachable WebDriver degrades to plain HTTP.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the listener cannot
/// bind.
pub async fn serve(config: &StakeConfig) -> Result<QueryServer> {
    let renderer = render::from_config(&config.scout);
    let aggregator = Aggregator::new(&config.scout, renderer)?;
    tracing::info!(
        sources = ?aggregator.source_names(),
        renderer = ?config.scout.renderer,
        "aggregator ready"
    );
    QueryServer::start(&config.server, Arc::new(aggregator)).await
}
