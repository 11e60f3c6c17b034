//! Scheduled Lambda: pull minute bars for the roster and push each one to Firehose.

use anyhow::Context;
use finance_stream::config::CollectorConfig;
use finance_stream::delivery::FirehoseStream;
use finance_stream::handler::{self, CollectorResponse};
use finance_stream::ingest::providers::yahoo::YahooChartProvider;
use finance_stream::telemetry;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;

async fn handle(cfg: &CollectorConfig, event: LambdaEvent<Value>) -> Result<CollectorResponse, Error> {
    tracing::info!(request_id = %event.context.request_id, "collector invoked");

    // Clients live for this invocation only.
    let source = YahooChartProvider::from_config(cfg)?;
    let stream = FirehoseStream::connect(cfg).await;

    Ok(handler::collect(&source, &stream, cfg).await?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let cfg = CollectorConfig::load().context("loading collector config")?;
    tracing::info!(
        tickers = cfg.tickers.len(),
        start = %cfg.start,
        end = %cfg.end,
        interval = %cfg.interval,
        stream = %cfg.stream_name,
        "collector config loaded"
    );

    let cfg = &cfg;
    run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle(cfg, event).await
    }))
    .await
    .map_err(|e| anyhow::anyhow!(e))
}
