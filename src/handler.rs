// src/handler.rs
// Invocation-level glue shared by the two Lambda binaries.

use serde::{Deserialize, Serialize};

use crate::config::CollectorConfig;
use crate::delivery::DeliveryStream;
use crate::error::PipelineError;
use crate::ingest::{self, types::QuoteSource, RunSummary};

/// Completion object returned by the collector on success.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CollectorResponse {
    pub status_code: u16,
    /// JSON-encoded summary string.
    pub body: String,
}

impl CollectorResponse {
    pub fn done(summary: &RunSummary, cfg: &CollectorConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            status_code: 200,
            body: serde_json::to_string(&summary.message(cfg))?,
        })
    }
}

/// One collector invocation. Errors propagate untouched so the runtime
/// reports the invocation as failed.
pub async fn collect(
    source: &dyn QuoteSource,
    stream: &dyn DeliveryStream,
    cfg: &CollectorConfig,
) -> Result<CollectorResponse, PipelineError> {
    let summary = ingest::run_once(source, stream, cfg).await?;
    CollectorResponse::done(&summary, cfg)
}
