use anyhow::{Context, Result};
use oddsedge::{JsonFeedClient, PipelineConfig, PipelineRunner};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    info!("Starting OddsEdge pipeline...");

    let reference_url = std::env::var("ODDSEDGE_REFERENCE_URL")
        .context("ODDSEDGE_REFERENCE_URL must be set to the reference feed endpoint")?;
    let candidates_url = std::env::var("ODDSEDGE_CANDIDATES_URL")
        .context("ODDSEDGE_CANDIDATES_URL must be set to the candidate feed endpoint")?;

    let config = match std::env::var("ODDSEDGE_CONFIG") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file {path}"))?;
            serde_json::from_str::<PipelineConfig>(&raw)
                .with_context(|| format!("failed to parse config file {path}"))?
        }
        Err(_) => PipelineConfig::default(),
    };

    let reference = Arc::new(JsonFeedClient::new("reference", reference_url));
    let candidates = Arc::new(JsonFeedClient::new("candidates", candidates_url));
    let runner = PipelineRunner::new(reference, candidates, config);

    let run = runner.run().await;
    println!("{}", serde_json::to_string_pretty(&run)?);
    Ok(())
}
