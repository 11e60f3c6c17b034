// src/error.rs
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Every failure either Lambda can surface. Nothing here is retried locally;
/// the invocation fails and the platform decides what happens next.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Quote source unreachable, non-2xx, or returned a body we could not read.
    #[error("fetching bars for {ticker} failed: {source}")]
    UpstreamFetch {
        ticker: String,
        #[source]
        source: BoxError,
    },

    /// `PutRecord` against the delivery stream failed (auth, throttling, network).
    #[error("publishing to delivery stream {stream} failed: {source}")]
    Publish {
        stream: String,
        #[source]
        source: BoxError,
    },

    /// Transformer input is missing fields the platform contract requires.
    #[error("malformed batch: {0}")]
    MalformedBatch(String),

    #[error("serializing quote event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn upstream(ticker: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::UpstreamFetch {
            ticker: ticker.into(),
            source: source.into(),
        }
    }

    pub fn publish(stream: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Publish {
            stream: stream.into(),
            source: source.into(),
        }
    }
}
