//! Firehose data-transformation callback.
//!
//! Firehose hands over a batch of base64 records and expects exactly one
//! result per record, same order, same `recordId`. A record is never left
//! out of the response: if it cannot be transformed it is answered with
//! `ProcessingFailed` and its original data.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Marker appended to every decoded payload before re-encoding.
pub const RECORD_SUFFIX: &[u8] = b"Cg";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InboundRecord {
    pub record_id: String,
    pub data: String,
}

/// Inbound invocation payload. Platform fields such as `invocationId` or
/// `deliveryStreamArn` are accepted and ignored.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FirehoseBatch {
    pub records: Vec<InboundRecord>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TransformStatus {
    Ok,
    Dropped,
    ProcessingFailed,
}

impl TransformStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "Ok",
            Self::Dropped => "Dropped",
            Self::ProcessingFailed => "ProcessingFailed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OutboundRecord {
    pub record_id: String,
    pub result: TransformStatus,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FirehoseResponse {
    pub records: Vec<OutboundRecord>,
}

impl FirehoseBatch {
    /// Validate a raw invocation payload. Any missing field fails the whole
    /// batch; Firehose needs an answer for every record it sent.
    pub fn from_value(event: serde_json::Value) -> Result<Self, PipelineError> {
        serde_json::from_value(event).map_err(|e| PipelineError::MalformedBatch(e.to_string()))
    }
}

/// Decode, append [`RECORD_SUFFIX`], re-encode.
pub fn transform_data(data: &str) -> Result<String, base64::DecodeError> {
    let mut raw = STANDARD.decode(data)?;
    raw.extend_from_slice(RECORD_SUFFIX);
    Ok(STANDARD.encode(raw))
}

pub fn transform_record(rec: InboundRecord) -> OutboundRecord {
    match transform_data(&rec.data) {
        Ok(data) => OutboundRecord {
            record_id: rec.record_id,
            result: TransformStatus::Ok,
            data,
        },
        Err(e) => {
            tracing::warn!(record_id = %rec.record_id, error = %e, "record data is not base64");
            OutboundRecord {
                record_id: rec.record_id,
                result: TransformStatus::ProcessingFailed,
                data: rec.data,
            }
        }
    }
}

/// 1 in, 1 out, order preserved.
pub fn transform_batch(batch: FirehoseBatch) -> FirehoseResponse {
    let records: Vec<OutboundRecord> = batch.records.into_iter().map(transform_record).collect();

    let failed = records
        .iter()
        .filter(|r| r.result != TransformStatus::Ok)
        .count();
    for r in &records {
        tracing::debug!(record_id = %r.record_id, result = r.result.as_str(), "record transformed");
        counter!("transformer_records_total", "result" => r.result.as_str()).increment(1);
    }
    tracing::info!(
        target: "transformer",
        records = records.len(),
        ok = records.len() - failed,
        failed,
        "batch transformed"
    );

    FirehoseResponse { records }
}

/// Entry point for the Lambda callback: validate, then transform.
pub fn handle_transform_event(event: serde_json::Value) -> Result<FirehoseResponse, PipelineError> {
    let batch = FirehoseBatch::from_value(event)?;
    Ok(transform_batch(batch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn appends_marker_to_decoded_payload() {
        assert_eq!(transform_data("SGVsbG8=").unwrap(), "SGVsbG9DZw==");
        assert_eq!(transform_data("").unwrap(), "Q2c=");
    }

    #[test]
    fn status_serializes_as_platform_tokens() {
        assert_eq!(serde_json::to_value(TransformStatus::Ok).unwrap(), json!("Ok"));
        assert_eq!(
            serde_json::to_value(TransformStatus::ProcessingFailed).unwrap(),
            json!("ProcessingFailed")
        );
        assert_eq!(TransformStatus::Dropped.as_str(), "Dropped");
    }

    #[test]
    fn undecodable_record_is_answered_not_dropped() {
        let out = transform_record(InboundRecord {
            record_id: "7".into(),
            data: "***".into(),
        });
        assert_eq!(out.record_id, "7");
        assert_eq!(out.result, TransformStatus::ProcessingFailed);
        assert_eq!(out.data, "***");
    }

    #[test]
    fn platform_fields_are_ignored() {
        let batch = FirehoseBatch::from_value(json!({
            "invocationId": "inv-1",
            "deliveryStreamArn": "arn:aws:firehose:us-east-2:1:deliverystream/finance-delivery-stream",
            "region": "us-east-2",
            "records": [{"recordId": "a", "approximateArrivalTimestamp": 1589463000000u64, "data": "SGVsbG8="}]
        }))
        .unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].record_id, "a");
    }
}
