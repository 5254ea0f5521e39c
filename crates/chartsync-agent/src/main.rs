//! ChartSync agent binary.

use anyhow::Result;
use chartsync_agent::{Agent, AgentConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting ChartSync Agent"
    );

    let config = AgentConfig::from_env()?;
    Agent::new(config).run().await?;

    Ok(())
}
