//! Source traits and structured error types.
//!
//! `HttpTransport` and `PriceSource` abstract over upstreams (Yahoo Finance,
//! FRED, the RSS feed) so implementations can be swapped and mocked in tests.
//! The cache layer sits above these traits; sources don't know about it.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::normalize::RawTable;

/// Structured error types for data operations.
///
/// Transport and schema failures are treated the same way by the fallback
/// chain. Only `AllSourcesFailed` is terminal.
#[derive(Debug, Clone, Error)]
pub enum DataError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("parse failure: {0}")]
    Parse(String),

    #[error("all sources failed for {indicator}: {}", describe_attempts(.attempts))]
    AllSourcesFailed {
        indicator: String,
        attempts: Vec<SourceAttempt>,
    },

    #[error("cache error: {0}")]
    Cache(String),

    #[error("frame error: {0}")]
    Frame(String),
}

/// One failed attempt inside a fallback chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAttempt {
    pub provider: DataSource,
    pub reason: String,
}

fn describe_attempts(attempts: &[SourceAttempt]) -> String {
    if attempts.is_empty() {
        return "no sources configured".to_string();
    }
    attempts
        .iter()
        .map(|a| format!("{} ({})", a.provider, a.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Fred,
    YahooFinance,
    YahooRss,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataSource::Fred => "fred",
            DataSource::YahooFinance => "yahoo_finance",
            DataSource::YahooRss => "yahoo_rss",
        };
        f.write_str(name)
    }
}

/// Lookback period understood by the price-series provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::FiveDays => "5d",
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
        }
    }
}

/// Sampling interval. Only daily-or-coarser bars are used by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1wk")]
    OneWeek,
    #[serde(rename = "1mo")]
    OneMonth,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneDay => "1d",
            Interval::OneWeek => "1wk",
            Interval::OneMonth => "1mo",
        }
    }
}

/// Single-request text transport (HTTP GET returning the body).
///
/// Implementations must not retry; retries happen only across a fallback chain.
pub trait HttpTransport: Send + Sync {
    fn get_text(&self, url: &str) -> Result<String, DataError>;
}

/// Trait for price-series providers.
///
/// Returns the raw table as the upstream shaped it. Callers run it through
/// the normalizer before use.
pub trait PriceSource: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Download bars for one or more tickers over a lookback period.
    fn download(
        &self,
        tickers: &[&str],
        period: Period,
        interval: Interval,
    ) -> Result<RawTable, DataError>;
}
