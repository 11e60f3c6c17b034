// src/config/collector.rs
use chrono::NaiveDate;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::PipelineError;

pub const ENV_CONFIG_PATH: &str = "COLLECTOR_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/collector.toml";

pub const DEFAULT_TICKERS: [&str; 10] = [
    "FB", "SHOP", "BYND", "NFLX", "PINS", "SQ", "TTD", "OKTA", "SNAP", "DDOG",
];
pub const DEFAULT_STREAM_NAME: &str = "finance-delivery-stream";
pub const DEFAULT_REGION: &str = "us-east-2";
pub const DEFAULT_SOURCE_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Bar resolution accepted by the quote source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BarInterval {
    #[default]
    OneMinute,
    TwoMinutes,
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    SixtyMinutes,
    NinetyMinutes,
    OneHour,
    OneDay,
}

impl BarInterval {
    /// Token used on the wire (`interval=` query parameter).
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::TwoMinutes => "2m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::ThirtyMinutes => "30m",
            Self::SixtyMinutes => "60m",
            Self::NinetyMinutes => "90m",
            Self::OneHour => "1h",
            Self::OneDay => "1d",
        }
    }
}

impl fmt::Display for BarInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BarInterval {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "1m" => Self::OneMinute,
            "2m" => Self::TwoMinutes,
            "5m" => Self::FiveMinutes,
            "15m" => Self::FifteenMinutes,
            "30m" => Self::ThirtyMinutes,
            "60m" => Self::SixtyMinutes,
            "90m" => Self::NinetyMinutes,
            "1h" => Self::OneHour,
            "1d" => Self::OneDay,
            other => {
                return Err(PipelineError::Config(format!(
                    "unsupported bar interval {other:?}"
                )))
            }
        })
    }
}

/// Everything one collector invocation needs. Built once at cold start and
/// handed to every invocation by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorConfig {
    pub tickers: Vec<String>,
    /// First trading day requested (inclusive).
    pub start: NaiveDate,
    /// Day after the last one requested (exclusive).
    pub end: NaiveDate,
    pub interval: BarInterval,
    pub stream_name: String,
    pub region: String,
    pub source_base_url: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            tickers: DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect(),
            start: NaiveDate::from_ymd_opt(2020, 5, 14).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2020, 5, 15).unwrap_or_default(),
            interval: BarInterval::OneMinute,
            stream_name: DEFAULT_STREAM_NAME.to_string(),
            region: DEFAULT_REGION.to_string(),
            source_base_url: DEFAULT_SOURCE_BASE_URL.to_string(),
        }
    }
}

/// Partial config as written in `collector.toml`; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    tickers: Option<Vec<String>>,
    start: Option<String>,
    end: Option<String>,
    interval: Option<String>,
    stream_name: Option<String>,
    region: Option<String>,
    source_base_url: Option<String>,
}

impl CollectorConfig {
    /// Defaults -> optional TOML file -> env overrides -> validation.
    ///
    /// File lookup:
    /// 1) $COLLECTOR_CONFIG_PATH (must exist when set)
    /// 2) config/collector.toml
    pub fn load() -> Result<Self, PipelineError> {
        let mut cfg = Self::default();

        if let Some(path) = resolve_config_path()? {
            cfg.apply_file(&path)?;
        }
        cfg.apply_env()?;
        cfg.validated()
    }

    /// Load from an explicit TOML file on top of defaults, without env overrides.
    pub fn load_from(path: &Path) -> Result<Self, PipelineError> {
        let mut cfg = Self::default();
        cfg.apply_file(path)?;
        cfg.validated()
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), PipelineError> {
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("reading {}: {e}", path.display()))
        })?;
        let file: FileConfig = toml::from_str(&content).map_err(|e| {
            PipelineError::Config(format!("parsing {}: {e}", path.display()))
        })?;

        if let Some(t) = file.tickers {
            self.tickers = t;
        }
        if let Some(s) = file.start {
            self.start = parse_date("start", &s)?;
        }
        if let Some(s) = file.end {
            self.end = parse_date("end", &s)?;
        }
        if let Some(s) = file.interval {
            self.interval = s.parse()?;
        }
        if let Some(s) = file.stream_name {
            self.stream_name = s;
        }
        if let Some(s) = file.region {
            self.region = s;
        }
        if let Some(s) = file.source_base_url {
            self.source_base_url = s;
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), PipelineError> {
        if let Some(v) = env_nonempty("COLLECTOR_TICKERS") {
            self.tickers = v.split(',').map(str::to_string).collect();
        }
        if let Some(v) = env_nonempty("COLLECTOR_START") {
            self.start = parse_date("COLLECTOR_START", &v)?;
        }
        if let Some(v) = env_nonempty("COLLECTOR_END") {
            self.end = parse_date("COLLECTOR_END", &v)?;
        }
        if let Some(v) = env_nonempty("COLLECTOR_INTERVAL") {
            self.interval = v.parse()?;
        }
        if let Some(v) = env_nonempty("DELIVERY_STREAM_NAME") {
            self.stream_name = v;
        }
        if let Some(v) = env_nonempty("FIREHOSE_REGION") {
            self.region = v;
        }
        if let Some(v) = env_nonempty("QUOTE_SOURCE_BASE_URL") {
            self.source_base_url = v;
        }
        Ok(())
    }

    /// Trim the roster and reject configs the collector cannot run with.
    pub fn validated(mut self) -> Result<Self, PipelineError> {
        self.tickers = self
            .tickers
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        if self.tickers.is_empty() {
            return Err(PipelineError::Config("ticker roster is empty".into()));
        }
        if self.start >= self.end {
            return Err(PipelineError::Config(format!(
                "start {} must be before end {}",
                self.start, self.end
            )));
        }
        if self.stream_name.trim().is_empty() {
            return Err(PipelineError::Config("stream name is empty".into()));
        }
        if self.region.trim().is_empty() {
            return Err(PipelineError::Config("region is empty".into()));
        }
        Ok(self)
    }
}

fn resolve_config_path() -> Result<Option<PathBuf>, PipelineError> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            return Err(PipelineError::Config(format!(
                "{ENV_CONFIG_PATH} points to non-existent path {}",
                pb.display()
            )));
        }
        return Ok(Some(pb));
    }
    let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
    Ok(fallback.exists().then_some(fallback))
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_date(field: &str, s: &str) -> Result<NaiveDate, PipelineError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| PipelineError::Config(format!("{field}: {s:?} is not YYYY-MM-DD ({e})")))
}
