//! Query server binary.
//!
//! Loads configuration (`$STAKE_CONFIG`, then `~/.config/stake/config.toml`,
//! then defaults; `$PORT` overrides the port) and serves `GET /api/{name}`
//! until interrupted.

use stake::StakeConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("stake=info,stake_scout=info")),
        )
        .init();

    tracing::info!("stake-server starting");

    let config = StakeConfig::load().map_err(|e| {
        tracing::error!(error = %e, "configuration rejected");
        anyhow::anyhow!("stake-server config: {e}")
    })?;

    let mut server = stake::serve(&config)
        .await
        .map_err(|e| anyhow::anyhow!("stake-server failed to start: {e}"))?;

    tokio::select! {
        result = server.wait() => {
            result.map_err(|e| anyhow::anyhow!("stake-server failed: {e}"))?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("interrupt received");
        }
    }

    server.shutdown();
    tracing::info!("stake-server shut down cleanly");
    Ok(())
}
