// src/lib.rs
// Public library surface for the two Lambda binaries and integration tests.

pub mod config;
pub mod delivery;
pub mod error;
pub mod handler;
pub mod ingest;
pub mod telemetry;
pub mod transform;

// ---- Re-exports for stable public API ----
pub use crate::config::{BarInterval, CollectorConfig};
pub use crate::delivery::DeliveryStream;
pub use crate::error::PipelineError;
pub use crate::ingest::types::{Bar, QuoteEvent, QuoteSource};
pub use crate::transform::{FirehoseBatch, FirehoseResponse, TransformStatus};
