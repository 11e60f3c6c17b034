// src/delivery/mod.rs
pub mod firehose;

use std::sync::{Mutex, MutexGuard};

use crate::error::PipelineError;

pub use firehose::FirehoseStream;

#[async_trait::async_trait]
pub trait DeliveryStream: Send + Sync {
    /// Publish one payload as one discrete record. No batching.
    async fn put_record(&self, payload: Vec<u8>) -> Result<(), PipelineError>;
    fn name(&self) -> &str;
}

// --- Test helper ---
/// Keeps every payload in memory. `failing_after(n)` accepts `n` records and
/// rejects the rest, so callers can check what a publish error aborts.
pub struct RecordingStream {
    name: String,
    fail_after: Option<usize>,
    pub records: Mutex<Vec<Vec<u8>>>,
}

impl RecordingStream {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fail_after: None,
            records: Mutex::new(vec![]),
        }
    }

    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    fn guard(&self) -> MutexGuard<'_, Vec<Vec<u8>>> {
        self.records.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    /// Payloads decoded as UTF-8 JSON text, in publish order.
    pub fn payloads(&self) -> Vec<String> {
        self.guard()
            .iter()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .collect()
    }
}

#[async_trait::async_trait]
impl DeliveryStream for RecordingStream {
    async fn put_record(&self, payload: Vec<u8>) -> Result<(), PipelineError> {
        let mut records = self.guard();
        if self.fail_after.is_some_and(|n| records.len() >= n) {
            return Err(PipelineError::publish(
                &self.name,
                "ServiceUnavailableException: slow down",
            ));
        }
        records.push(payload);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
