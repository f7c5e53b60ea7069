//! Canonical series representation shared by every stage downstream of the
//! normalizer.
//!
//! A `CanonicalSeries` is keyed by naive timestamps in a `BTreeMap`, so
//! ordering and uniqueness hold by construction. Non-finite values are
//! rejected at insert time, which makes "last point" and "last non-missing
//! point" the same thing.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDateTime, NaiveTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::provider::DataError;
use crate::signals::change;

/// Ordered timestamp → value series tagged with a ticker or indicator id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSeries {
    ticker: String,
    points: BTreeMap<NaiveDateTime, f64>,
}

impl CanonicalSeries {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            points: BTreeMap::new(),
        }
    }

    pub fn from_points(
        ticker: impl Into<String>,
        points: impl IntoIterator<Item = (NaiveDateTime, f64)>,
    ) -> Self {
        let mut series = Self::new(ticker);
        for (ts, value) in points {
            series.insert(ts, value);
        }
        series
    }

    /// Insert a point, replacing any value already at `ts`.
    ///
    /// Returns false (and stores nothing) for NaN or infinite values.
    pub fn insert(&mut self, ts: NaiveDateTime, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        self.points.insert(ts, value);
        true
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, ts: &NaiveDateTime) -> Option<f64> {
        self.points.get(ts).copied()
    }

    pub fn first(&self) -> Option<(NaiveDateTime, f64)> {
        self.points.first_key_value().map(|(ts, v)| (*ts, *v))
    }

    pub fn latest(&self) -> Option<(NaiveDateTime, f64)> {
        self.points.last_key_value().map(|(ts, v)| (*ts, *v))
    }

    pub fn latest_value(&self) -> Option<f64> {
        self.latest().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (NaiveDateTime, f64)> + '_ {
        self.points.iter().map(|(ts, v)| (*ts, *v))
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.values().copied().collect()
    }

    /// The most recent `n` points.
    pub fn tail(&self, n: usize) -> Self {
        let skip = self.points.len().saturating_sub(n);
        Self {
            ticker: self.ticker.clone(),
            points: self.points.iter().skip(skip).map(|(k, v)| (*k, *v)).collect(),
        }
    }

    /// Drop points strictly before `cutoff`.
    pub fn retain_since(&mut self, cutoff: NaiveDateTime) {
        self.points = self.points.split_off(&cutoff);
    }

    /// Apply `f` to every value. Points whose new value is non-finite are dropped.
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> Self {
        Self::from_points(self.ticker.clone(), self.iter().map(|(ts, v)| (ts, f(v))))
    }

    /// Truncate every timestamp to midnight of its calendar date.
    ///
    /// When two points fall on the same date the later one wins.
    pub fn floor_to_dates(&self) -> Self {
        Self::from_points(
            self.ticker.clone(),
            self.iter()
                .map(|(ts, v)| (ts.date().and_time(NaiveTime::MIN), v)),
        )
    }

    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = ticker.into();
        self
    }

    /// Percent change from the first to the last point.
    ///
    /// `Some(0.0)` for one point, `None` when empty or the first value is zero.
    pub fn pct_change_first_last(&self) -> Option<f64> {
        change::pct_change_first_last(&self.values())
    }

    /// Percent change between the final two of the last `lookback` points.
    pub fn pct_change_last_period(&self, lookback: usize) -> Option<f64> {
        let values = self.values();
        let start = values.len().saturating_sub(lookback);
        change::pct_change_last_period(&values[start..])
    }
}

/// Ticker → series mapping for multi-ticker fetches.
///
/// Tickers with no retrievable data are absent rather than present-with-empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSeriesSet {
    series: BTreeMap<String, CanonicalSeries>,
}

impl CanonicalSeriesSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a series under its own ticker. Empty series are skipped.
    pub fn insert(&mut self, series: CanonicalSeries) {
        if series.is_empty() {
            return;
        }
        self.series.insert(series.ticker.clone(), series);
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.series.contains_key(ticker)
    }

    pub fn get(&self, ticker: &str) -> Option<&CanonicalSeries> {
        self.series.get(ticker)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CanonicalSeries)> {
        self.series.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Series for `ticker`, or the first series when the set holds exactly one.
    ///
    /// Single-ticker flat responses are keyed by the requested ticker already;
    /// the second case covers a provider that echoes a different symbol.
    pub fn get_or_sole(&self, ticker: &str) -> Option<&CanonicalSeries> {
        self.get(ticker).or_else(|| match self.series.len() {
            1 => self.series.values().next(),
            _ => None,
        })
    }

    /// Re-key series through `aliases` (ticker → display name).
    /// Tickers without an alias keep their name.
    pub fn renamed(&self, aliases: &[(&str, &str)]) -> Self {
        let mut out = Self::new();
        for (ticker, series) in &self.series {
            let name = aliases
                .iter()
                .find(|(from, _)| *from == ticker.as_str())
                .map(|(_, to)| *to)
                .unwrap_or(ticker.as_str());
            out.insert(series.clone().with_ticker(name));
        }
        out
    }

    /// Wide frame: a `timestamp` column over the union of all timestamps plus
    /// one nullable column per ticker.
    pub fn to_frame(&self) -> Result<DataFrame, DataError> {
        let stamps: BTreeSet<NaiveDateTime> = self
            .series
            .values()
            .flat_map(|s| s.points.keys().copied())
            .collect();

        let millis: Vec<i64> = stamps
            .iter()
            .map(|ts| ts.and_utc().timestamp_millis())
            .collect();

        let mut columns = Vec::with_capacity(self.series.len() + 1);
        columns.push(
            Column::new("timestamp".into(), millis)
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
                .map_err(|e| DataError::Frame(format!("timestamp cast: {e}")))?,
        );
        for (ticker, series) in &self.series {
            let values: Vec<Option<f64>> = stamps.iter().map(|ts| series.get(ts)).collect();
            columns.push(Column::new(ticker.as_str().into(), values));
        }

        DataFrame::new(columns).map_err(|e| DataError::Frame(format!("dataframe creation: {e}")))
    }
}
