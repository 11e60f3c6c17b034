// src/ingest/types.rs
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::config::{BarInterval, CollectorConfig};
use crate::error::PipelineError;

/// Format of `QuoteEvent::ts`; exchange-local wall clock, second precision.
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One aggregated price observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub ts: NaiveDateTime, // exchange-local
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Window + resolution asked of the quote source for every ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub interval: BarInterval,
}

impl From<&CollectorConfig> for BarQuery {
    fn from(cfg: &CollectorConfig) -> Self {
        Self {
            start: cfg.start,
            end: cfg.end,
            interval: cfg.interval,
        }
    }
}

/// Exactly what goes onto the delivery stream, in this key order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuoteEvent {
    pub name: String,
    pub high: f64,
    pub low: f64,
    pub ts: String,
}

impl QuoteEvent {
    pub fn from_bar(ticker: &str, bar: &Bar) -> Self {
        Self {
            name: ticker.to_string(),
            high: bar.high,
            low: bar.low,
            ts: bar.ts.format(TS_FORMAT).to_string(),
        }
    }

    pub fn parsed_ts(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.ts, TS_FORMAT).ok()
    }
}

#[async_trait::async_trait]
pub trait QuoteSource: Send + Sync {
    /// Bars for `ticker` over `query`, oldest first. An empty vec is a
    /// quiet ticker, not an error.
    async fn fetch_bars(&self, ticker: &str, query: &BarQuery) -> Result<Vec<Bar>, PipelineError>;
    fn name(&self) -> &'static str;
}
