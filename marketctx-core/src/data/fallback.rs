//! Fallback chain for a single logical indicator.
//!
//! Sources are tried in fixed priority order:
//! 1. Primary source → use it, even when it returns an empty series
//! 2. On any failure (transport, schema, parse) → next source
//! 3. All sources failed → `DataError::AllSourcesFailed`
//!
//! No source is retried. Unit/scale conversion for proxy instruments happens
//! inside the proxy source, so every source in a chain yields the same unit.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::normalize::normalize_close;
use super::provider::{DataError, DataSource, Interval, Period, PriceSource, SourceAttempt};
use super::series::CanonicalSeries;

/// One source able to produce an indicator series.
pub trait IndicatorSource: Send + Sync {
    /// Provenance tag reported with a successful result.
    fn source(&self) -> DataSource;

    /// Fetch the series. `now` anchors any trailing window.
    fn fetch(&self, now: DateTime<Utc>) -> Result<CanonicalSeries, DataError>;
}

/// A series together with the source that satisfied the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcedSeries {
    pub series: CanonicalSeries,
    pub source: DataSource,
}

/// Ordered list of sources for one indicator.
pub struct FallbackChain {
    indicator: String,
    sources: Vec<Box<dyn IndicatorSource>>,
}

impl FallbackChain {
    pub fn new(indicator: impl Into<String>) -> Self {
        Self {
            indicator: indicator.into(),
            sources: Vec::new(),
        }
    }

    pub fn then(mut self, source: impl IndicatorSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Try each source in order and return the first success.
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<SourcedSeries, DataError> {
        let mut attempts = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            match source.fetch(now) {
                Ok(series) => {
                    info!(
                        indicator = %self.indicator,
                        source = %source.source(),
                        points = series.len(),
                        "indicator resolved"
                    );
                    return Ok(SourcedSeries {
                        series,
                        source: source.source(),
                    });
                }
                Err(e) => {
                    warn!(
                        indicator = %self.indicator,
                        source = %source.source(),
                        error = %e,
                        "source failed, falling through"
                    );
                    attempts.push(SourceAttempt {
                        provider: source.source(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Err(DataError::AllSourcesFailed {
            indicator: self.indicator.clone(),
            attempts,
        })
    }
}

/// A tradable proxy quoted at a multiple of the target indicator.
///
/// The proxy's close series is divided by `divisor` and its timestamps are
/// floored to calendar dates, matching date-indexed primary sources. An
/// empty normalized result is a failure here: a proxy is only consulted when
/// something better already failed.
pub struct ProxySeriesSource {
    prices: Arc<dyn PriceSource>,
    ticker: String,
    period: Period,
    interval: Interval,
    divisor: f64,
    output_ticker: String,
}

impl ProxySeriesSource {
    pub fn new(
        prices: Arc<dyn PriceSource>,
        ticker: impl Into<String>,
        period: Period,
        interval: Interval,
        divisor: f64,
        output_ticker: impl Into<String>,
    ) -> Self {
        Self {
            prices,
            ticker: ticker.into(),
            period,
            interval,
            divisor,
            output_ticker: output_ticker.into(),
        }
    }
}

impl IndicatorSource for ProxySeriesSource {
    fn source(&self) -> DataSource {
        DataSource::YahooFinance
    }

    fn fetch(&self, _now: DateTime<Utc>) -> Result<CanonicalSeries, DataError> {
        let raw = self
            .prices
            .download(&[self.ticker.as_str()], self.period, self.interval)?;
        let set = normalize_close(Some(&raw), &[self.ticker.as_str()]);

        let series = set
            .get_or_sole(&self.ticker)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                DataError::SchemaMismatch(format!(
                    "no {} data from {}",
                    self.ticker,
                    self.prices.name()
                ))
            })?;

        let divisor = self.divisor;
        Ok(series
            .map_values(|v| v / divisor)
            .floor_to_dates()
            .with_ticker(self.output_ticker.clone()))
    }
}
