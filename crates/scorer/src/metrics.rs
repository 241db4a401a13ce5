use anyhow::Result;
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;

pub fn describe() {
    describe_counter!(
        "scorer_transactions_ingested_total",
        "Number of transactions read by the scorer."
    );
    describe_counter!(
        "scorer_wallets_scored_total",
        "Number of wallets given a risk score."
    );
    describe_counter!(
        "scorer_risky_wallets_total",
        "Number of wallets labelled risky, by rule."
    );
    describe_counter!(
        "scorer_transactions_filtered_total",
        "Number of transactions kept by the protocol contract filter."
    );
    describe_counter!(
        "scorer_api_requests_total",
        "Number of Etherscan API requests made."
    );
    describe_histogram!(
        "scorer_api_latency_ms",
        "Etherscan API request latency in milliseconds."
    );
}

pub fn install_prometheus(port: u16) -> Result<PrometheusHandle> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    Ok(PrometheusBuilder::new()
        .with_http_listener(addr)
        .install_recorder()?)
}
