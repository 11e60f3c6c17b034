use aws_sdk_firehose::config::Region;
use aws_sdk_firehose::error::DisplayErrorContext;
use aws_sdk_firehose::primitives::Blob;
use aws_sdk_firehose::types::Record;
use aws_sdk_firehose::Client;

use super::DeliveryStream;
use crate::config::CollectorConfig;
use crate::error::PipelineError;

/// Kinesis Data Firehose delivery stream, written one `PutRecord` at a time.
pub struct FirehoseStream {
    client: Client,
    stream_name: String,
}

impl FirehoseStream {
    /// Resolve credentials from the Lambda environment and pin the region.
    /// Meant to be built per invocation and dropped with it.
    pub async fn connect(cfg: &CollectorConfig) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .load()
            .await;
        Self::new(Client::new(&sdk_config), cfg.stream_name.clone())
    }

    pub fn new(client: Client, stream_name: String) -> Self {
        Self {
            client,
            stream_name,
        }
    }
}

#[async_trait::async_trait]
impl DeliveryStream for FirehoseStream {
    async fn put_record(&self, payload: Vec<u8>) -> Result<(), PipelineError> {
        let record = Record::builder()
            .data(Blob::new(payload))
            .build()
            .map_err(|e| PipelineError::publish(&self.stream_name, e))?;

        let out = self
            .client
            .put_record()
            .delivery_stream_name(&self.stream_name)
            .record(record)
            .send()
            .await
            .map_err(|e| {
                PipelineError::publish(&self.stream_name, DisplayErrorContext(e).to_string())
            })?;

        tracing::trace!(
            stream = %self.stream_name,
            record_id = out.record_id(),
            "put_record ok"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        &self.stream_name
    }
}
