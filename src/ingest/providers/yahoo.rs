use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use reqwest::Client;
use serde::Deserialize;

use crate::config::CollectorConfig;
use crate::error::PipelineError;
use crate::ingest::types::{Bar, BarQuery, QuoteSource};

// Yahoo rejects requests without a browser-ish agent.
const USER_AGENT: &str = "Mozilla/5.0 (compatible; finance-stream/0.1)";
// Chart error code for "no data, symbol may be delisted".
const NOT_FOUND: &str = "Not Found";

#[derive(Debug, Deserialize)]
struct Envelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: Meta,
    // Absent when the window holds no bars.
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Meta {
    // e.g. "America/New_York"; preferred over gmtoffset, which is only the
    // offset in force when the request was made.
    exchange_timezone_name: Option<String>,
    #[serde(default)]
    gmtoffset: i64,
}

impl Meta {
    fn timezone(&self) -> Option<Tz> {
        self.exchange_timezone_name.as_deref()?.parse().ok()
    }
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Columns>,
}

#[derive(Debug, Default, Deserialize)]
struct Columns {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

fn utc_midnight(d: NaiveDate) -> i64 {
    d.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

fn at(column: &[Option<f64>], i: usize) -> Option<f64> {
    column.get(i).copied().flatten()
}

/// Wall-clock time at the exchange for one bar. Falls back to the fixed
/// `gmtoffset` only when the response names no usable zone.
fn exchange_local(epoch: i64, tz: Option<Tz>, gmtoffset: i64) -> Option<NaiveDateTime> {
    match tz {
        Some(tz) => DateTime::from_timestamp(epoch, 0).map(|dt| dt.with_timezone(&tz).naive_local()),
        None => DateTime::from_timestamp(epoch + gmtoffset, 0).map(|dt| dt.naive_utc()),
    }
}

/// Minute bars from the Yahoo Finance chart API.
pub struct YahooChartProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { base_url: String, client: Client },
}

impl YahooChartProvider {
    /// Serve the same captured chart body for every ticker.
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_url(base_url: &str) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PipelineError::Config(format!("building http client: {e}")))?;
        Ok(Self {
            mode: Mode::Http {
                base_url: base_url.trim_end_matches('/').to_string(),
                client,
            },
        })
    }

    pub fn from_config(cfg: &CollectorConfig) -> Result<Self, PipelineError> {
        Self::from_url(&cfg.source_base_url)
    }

    /// Turn one chart response body into bars, oldest first.
    pub fn parse_chart(ticker: &str, body: &str) -> Result<Vec<Bar>, PipelineError> {
        let env: Envelope = serde_json::from_str(body)
            .map_err(|e| PipelineError::upstream(ticker, e))?;

        if let Some(err) = env.chart.error {
            if err.code == NOT_FOUND {
                tracing::warn!(
                    ticker,
                    reason = err.description.as_deref().unwrap_or_default(),
                    "no data for ticker"
                );
                return Ok(vec![]);
            }
            return Err(PipelineError::upstream(
                ticker,
                format!(
                    "{}: {}",
                    err.code,
                    err.description.unwrap_or_default()
                ),
            ));
        }

        let Some(result) = env.chart.result.and_then(|r| r.into_iter().next()) else {
            return Ok(vec![]);
        };
        let cols = result.indicators.quote.into_iter().next().unwrap_or_default();
        let tz = result.meta.timezone();
        if tz.is_none() {
            tracing::debug!(ticker, gmtoffset = result.meta.gmtoffset, "no exchange timezone, using fixed offset");
        }

        let mut bars = Vec::with_capacity(result.timestamp.len());
        for (i, &epoch) in result.timestamp.iter().enumerate() {
            let (Some(high), Some(low)) = (at(&cols.high, i), at(&cols.low, i)) else {
                continue;
            };
            let Some(ts) = exchange_local(epoch, tz, result.meta.gmtoffset) else {
                return Err(PipelineError::upstream(
                    ticker,
                    format!("timestamp {epoch} out of range"),
                ));
            };
            bars.push(Bar {
                ts,
                open: at(&cols.open, i).unwrap_or(f64::NAN),
                high,
                low,
                close: at(&cols.close, i).unwrap_or(f64::NAN),
                volume: at(&cols.volume, i).unwrap_or(0.0) as u64,
            });
        }
        bars.sort_by_key(|b| b.ts);
        Ok(bars)
    }
}

#[async_trait]
impl QuoteSource for YahooChartProvider {
    async fn fetch_bars(&self, ticker: &str, query: &BarQuery) -> Result<Vec<Bar>, PipelineError> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_chart(ticker, s),

            Mode::Http { base_url, client } => {
                let url = format!("{base_url}/v8/finance/chart/{ticker}");
                let resp = client
                    .get(&url)
                    .query(&[
                        ("period1", utc_midnight(query.start).to_string()),
                        ("period2", utc_midnight(query.end).to_string()),
                        ("interval", query.interval.as_str().to_string()),
                        ("includePrePost", "false".to_string()),
                    ])
                    .send()
                    .await
                    .map_err(|e| PipelineError::upstream(ticker, e))?;

                let status = resp.status();
                let body = resp
                    .text()
                    .await
                    .map_err(|e| PipelineError::upstream(ticker, e))?;

                if !status.is_success() {
                    // Yahoo answers unknown symbols with 404 + a chart error body.
                    let parsed = Self::parse_chart(ticker, &body);
                    if matches!(&parsed, Ok(bars) if bars.is_empty()) {
                        return parsed;
                    }
                    return Err(PipelineError::upstream(ticker, format!("HTTP {status}")));
                }
                Self::parse_chart(ticker, &body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "yahoo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_null_rows_and_shifts_to_exchange_time() {
        // 1589463000 = 2020-05-14 13:30:00 UTC = 09:30 EDT
        let body = r#"{"chart":{"result":[{
            "meta":{"symbol":"NFLX","gmtoffset":-14400},
            "timestamp":[1589463000,1589463060,1589463120],
            "indicators":{"quote":[{
                "open":[419.0,null,420.0],
                "high":[420.1,null,421.0],
                "low":[418.0,null,419.5],
                "close":[419.9,null,420.7],
                "volume":[1200,null,900]
            }]}}],"error":null}}"#;
        let bars = YahooChartProvider::parse_chart("NFLX", body).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].ts.to_string(), "2020-05-14 09:30:00");
        assert_eq!(bars[1].ts.to_string(), "2020-05-14 09:32:00");
        assert_eq!(bars[0].high, 420.1);
        assert_eq!(bars[1].low, 419.5);
        assert_eq!(bars[1].volume, 900);
    }

    #[test]
    fn exchange_zone_follows_dst_across_the_window() {
        // 09:30 EST on 2020-03-06 and 09:30 EDT on 2020-03-09; gmtoffset is
        // whatever was in force at fetch time and must not be applied.
        let body = r#"{"chart":{"result":[{
            "meta":{"symbol":"NFLX","exchangeTimezoneName":"America/New_York","gmtoffset":-18000},
            "timestamp":[1583505000,1583760600],
            "indicators":{"quote":[{"high":[380.0,361.0],"low":[375.0,355.0]}]}}],"error":null}}"#;
        let bars = YahooChartProvider::parse_chart("NFLX", body).unwrap();
        assert_eq!(bars[0].ts.to_string(), "2020-03-06 09:30:00");
        assert_eq!(bars[1].ts.to_string(), "2020-03-09 09:30:00");
    }

    #[test]
    fn unknown_zone_falls_back_to_gmtoffset() {
        let body = r#"{"chart":{"result":[{
            "meta":{"exchangeTimezoneName":"Mars/Olympus_Mons","gmtoffset":-14400},
            "timestamp":[1589463000],
            "indicators":{"quote":[{"high":[1.0],"low":[0.5]}]}}],"error":null}}"#;
        let bars = YahooChartProvider::parse_chart("SQ", body).unwrap();
        assert_eq!(bars[0].ts.to_string(), "2020-05-14 09:30:00");
    }

    #[test]
    fn out_of_order_rows_come_back_ascending() {
        let body = r#"{"chart":{"result":[{
            "meta":{"exchangeTimezoneName":"America/New_York","gmtoffset":-14400},
            "timestamp":[1589463120,1589463000,1589463060],
            "indicators":{"quote":[{"high":[3.0,1.0,2.0],"low":[2.5,0.5,1.5]}]}}],"error":null}}"#;
        let bars = YahooChartProvider::parse_chart("OKTA", body).unwrap();
        let times: Vec<String> = bars.iter().map(|b| b.ts.format("%H:%M").to_string()).collect();
        assert_eq!(times, vec!["09:30", "09:31", "09:32"]);
        // values stay attached to their own timestamp
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        assert_eq!(highs, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn missing_timestamps_is_an_empty_series() {
        let body = r#"{"chart":{"result":[{"meta":{"gmtoffset":-14400},
            "indicators":{"quote":[{}]}}],"error":null}}"#;
        assert!(YahooChartProvider::parse_chart("PINS", body).unwrap().is_empty());
    }

    #[test]
    fn not_found_is_empty_other_errors_fail() {
        let gone = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(YahooChartProvider::parse_chart("FB", gone).unwrap().is_empty());

        let bad = r#"{"chart":{"result":null,"error":{"code":"Unprocessable Entity","description":"1m data not available"}}}"#;
        let err = YahooChartProvider::parse_chart("FB", bad).unwrap_err();
        assert!(matches!(err, PipelineError::UpstreamFetch { ref ticker, .. } if ticker == "FB"));
    }

    #[test]
    fn garbage_body_is_upstream_error() {
        let err = YahooChartProvider::parse_chart("SQ", "<html>").unwrap_err();
        assert!(matches!(err, PipelineError::UpstreamFetch { .. }));
    }

    #[test]
    fn window_uses_utc_midnight() {
        let d = NaiveDate::from_ymd_opt(2020, 5, 14).unwrap();
        assert_eq!(utc_midnight(d), 1_589_414_400);
    }
}
