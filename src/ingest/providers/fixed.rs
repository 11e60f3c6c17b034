use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::ingest::types::{Bar, BarQuery, QuoteSource};

/// In-memory quote source keyed by ticker. Unknown tickers have no bars;
/// tickers registered with `fail` return an upstream error.
#[derive(Default)]
pub struct StaticQuoteSource {
    bars: HashMap<String, Vec<Bar>>,
    failing: HashMap<String, String>,
}

impl StaticQuoteSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<Bar>) -> Self {
        self.bars.insert(ticker.to_string(), bars);
        self
    }

    pub fn fail(mut self, ticker: &str, reason: &str) -> Self {
        self.failing.insert(ticker.to_string(), reason.to_string());
        self
    }
}

#[async_trait]
impl QuoteSource for StaticQuoteSource {
    async fn fetch_bars(&self, ticker: &str, _query: &BarQuery) -> Result<Vec<Bar>, PipelineError> {
        if let Some(reason) = self.failing.get(ticker) {
            return Err(PipelineError::upstream(ticker, reason.clone()));
        }
        Ok(self.bars.get(ticker).cloned().unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
