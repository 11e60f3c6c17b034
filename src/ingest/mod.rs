// src/ingest/mod.rs
pub mod providers;
pub mod types;

use crate::config::CollectorConfig;
use crate::delivery::DeliveryStream;
use crate::error::PipelineError;
use crate::ingest::types::{BarQuery, QuoteEvent, QuoteSource};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

/// One-time metrics registration (no-op until a recorder is installed).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "collector_records_published_total",
            "Quote events accepted by the delivery stream."
        );
        describe_counter!(
            "collector_tickers_empty_total",
            "Tickers that returned no bars for the window."
        );
        describe_counter!(
            "collector_fetch_errors_total",
            "Quote source fetch/parse errors."
        );
        describe_counter!(
            "collector_publish_errors_total",
            "Delivery stream put_record failures."
        );
    });
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerCount {
    pub ticker: String,
    pub published: usize,
}

/// What one collector run did, per ticker in roster order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub tickers: Vec<TickerCount>,
    pub total_published: usize,
    /// JSON of the final record written; informational only.
    pub last_event: Option<String>,
}

impl RunSummary {
    pub fn message(&self, cfg: &CollectorConfig) -> String {
        format!(
            "Done! Published {} records for {} tickers ({}..{}, {})",
            self.total_published,
            self.tickers.len(),
            cfg.start,
            cfg.end,
            cfg.interval
        )
    }
}

/// Serialize one event exactly as it travels on the stream.
pub fn encode_event(ev: &QuoteEvent) -> Result<Vec<u8>, PipelineError> {
    Ok(serde_json::to_vec(ev)?)
}

/// Fetch every ticker in roster order and publish each bar as its own
/// record, one `put_record` at a time. The first error aborts the run.
pub async fn run_once(
    source: &dyn QuoteSource,
    stream: &dyn DeliveryStream,
    cfg: &CollectorConfig,
) -> Result<RunSummary, PipelineError> {
    ensure_metrics_described();

    let query = BarQuery::from(cfg);
    let mut summary = RunSummary::default();

    for ticker in &cfg.tickers {
        let bars = source.fetch_bars(ticker, &query).await.inspect_err(|e| {
            counter!("collector_fetch_errors_total").increment(1);
            tracing::warn!(error = %e, ticker = %ticker, provider = source.name(), "fetch failed");
        })?;

        if bars.is_empty() {
            counter!("collector_tickers_empty_total").increment(1);
        }

        let mut published = 0usize;
        for bar in &bars {
            let ev = QuoteEvent::from_bar(ticker, bar);
            let payload = encode_event(&ev)?;
            let last = String::from_utf8_lossy(&payload).into_owned();

            stream.put_record(payload).await.inspect_err(|e| {
                counter!("collector_publish_errors_total").increment(1);
                tracing::warn!(error = %e, ticker = %ticker, stream = stream.name(), "publish failed");
            })?;

            counter!("collector_records_published_total").increment(1);
            published += 1;
            summary.last_event = Some(last);
        }

        tracing::info!(
            target: "collector",
            ticker = %ticker,
            bars = bars.len(),
            published,
            "ticker done"
        );
        summary.total_published += published;
        summary.tickers.push(TickerCount {
            ticker: ticker.clone(),
            published,
        });
    }

    tracing::info!(
        target: "collector",
        tickers = summary.tickers.len(),
        total = summary.total_published,
        stream = stream.name(),
        "collector run finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::RecordingStream;
    use crate::ingest::providers::fixed::StaticQuoteSource;
    use crate::ingest::types::Bar;
    use chrono::NaiveDate;

    fn bar_at(min: u32, high: f64, low: f64) -> Bar {
        Bar {
            ts: NaiveDate::from_ymd_opt(2020, 5, 14)
                .unwrap()
                .and_hms_opt(9, min, 0)
                .unwrap(),
            open: low,
            high,
            low,
            close: high,
            volume: 10,
        }
    }

    fn cfg(tickers: &[&str]) -> CollectorConfig {
        CollectorConfig {
            tickers: tickers.iter().map(|t| t.to_string()).collect(),
            ..CollectorConfig::default()
        }
    }

    #[tokio::test]
    async fn summary_counts_per_ticker_in_roster_order() {
        let source = StaticQuoteSource::new()
            .with_bars("SQ", vec![bar_at(30, 2.0, 1.0)])
            .with_bars("NFLX", vec![bar_at(30, 2.0, 1.0), bar_at(31, 3.0, 2.0)]);
        let stream = RecordingStream::new("finance-delivery-stream");
        let c = cfg(&["NFLX", "PINS", "SQ"]);

        let s = run_once(&source, &stream, &c).await.unwrap();
        assert_eq!(s.total_published, 3);
        let counts: Vec<_> = s.tickers.iter().map(|t| (t.ticker.as_str(), t.published)).collect();
        assert_eq!(counts, vec![("NFLX", 2), ("PINS", 0), ("SQ", 1)]);
        assert_eq!(
            s.message(&c),
            "Done! Published 3 records for 3 tickers (2020-05-14..2020-05-15, 1m)"
        );
        assert!(s.last_event.unwrap().contains("\"SQ\""));
    }
}
