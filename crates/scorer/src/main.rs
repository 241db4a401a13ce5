use anyhow::Result;

mod action;
mod cli;
mod export;
mod fetch;
mod filter;
mod ingestion;
mod metrics;
mod pipeline;
mod wallet_features;
mod wallet_rules_engine;
mod wallet_scoring;

#[tokio::main]
async fn main() -> Result<()> {
    let config = common::config::Config::load()?;

    let (dispatch, _otel_guard) =
        common::observability::build_dispatch("scorer", &config.general.log_level);
    tracing::dispatcher::set_global_default(dispatch).map_err(anyhow::Error::msg)?;

    let cmd = cli::parse_args(std::env::args()).map_err(anyhow::Error::msg)?;
    tracing::info!(command = ?cmd, "wallet scorer starting");

    if let Some(port) = config.observability.prometheus_port {
        metrics::install_prometheus(port)?;
        tracing::info!(port, "prometheus exporter listening");
    }
    metrics::describe();

    if let Err(e) = cli::run_command(&config, cmd).await {
        tracing::error!(error = %format!("{e:#}"), "command failed");
        return Err(e);
    }
    Ok(())
}
