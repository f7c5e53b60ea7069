//! Yahoo Finance price-series provider.
//!
//! Fetches bars from Yahoo's v8 chart API, one request per ticker, and
//! assembles them into the table shape a grouped download produces: flat
//! `Open/High/Low/Close/Adj Close/Volume` columns for a single ticker, and
//! ticker-major `(ticker, field)` columns for several.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes, which is why downstream code goes through the normalizer rather
//! than addressing columns directly.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use tracing::{debug, info, warn};
use urlencoding::encode;

use super::normalize::{ColumnKey, RawTable};
use super::provider::{DataError, HttpTransport, Interval, Period, PriceSource};

pub const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";

const FIELDS: [&str; 6] = ["Open", "High", "Low", "Close", "Adj Close", "Volume"];

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i32,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// Bars for one ticker, columns in `FIELDS` order.
#[derive(Debug, Default)]
struct TickerBars {
    index: Vec<DateTime<FixedOffset>>,
    fields: [Vec<Option<f64>>; 6],
}

/// Yahoo Finance price source.
pub struct YahooPriceSource {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
}

impl YahooPriceSource {
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
        }
    }

    /// Build the chart API URL for a symbol, period and interval.
    pub fn chart_url(&self, symbol: &str, period: Period, interval: Interval) -> String {
        format!(
            "{}/v8/finance/chart/{}?range={}&interval={}&includeAdjustedClose=true",
            self.base_url.trim_end_matches('/'),
            encode(symbol),
            period.as_str(),
            interval.as_str(),
        )
    }

    fn fetch_ticker(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<TickerBars, DataError> {
        let url = self.chart_url(symbol, period, interval);
        let body = self.transport.get_text(&url)?;
        let chart: ChartResponse = serde_json::from_str(&body).map_err(|e| {
            DataError::Parse(format!("failed to parse chart response for {symbol}: {e}"))
        })?;
        parse_chart(symbol, chart)
    }
}

impl PriceSource for YahooPriceSource {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn download(
        &self,
        tickers: &[&str],
        period: Period,
        interval: Interval,
    ) -> Result<RawTable, DataError> {
        info!(?tickers, period = period.as_str(), interval = interval.as_str(), "downloading");

        if let [symbol] = tickers {
            let bars = self.fetch_ticker(symbol, period, interval)?;
            return Ok(flat_table(bars));
        }

        let mut fetched = Vec::with_capacity(tickers.len());
        let mut last_error = None;
        for symbol in tickers {
            match self.fetch_ticker(symbol, period, interval) {
                Ok(bars) => fetched.push((*symbol, bars)),
                Err(e) => {
                    warn!(symbol, error = %e, "ticker fetch failed, omitting from table");
                    last_error = Some(e);
                }
            }
        }

        match (fetched.is_empty(), last_error) {
            (true, Some(e)) => Err(e),
            _ => Ok(ticker_major_table(fetched)),
        }
    }
}

/// Parse the chart API response into per-field columns.
fn parse_chart(symbol: &str, resp: ChartResponse) -> Result<TickerBars, DataError> {
    let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
        Some(err) => DataError::SchemaMismatch(format!(
            "{symbol}: {}: {}",
            err.code, err.description
        )),
        None => DataError::SchemaMismatch(format!("{symbol}: empty result with no error")),
    })?;

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| DataError::SchemaMismatch(format!("{symbol}: result array is empty")))?;

    // No timestamps means no bars in range: a valid empty answer.
    let Some(timestamps) = data.timestamp else {
        debug!(symbol, "chart has no timestamps");
        return Ok(TickerBars::default());
    };

    let offset = FixedOffset::east_opt(data.meta.gmtoffset).ok_or_else(|| {
        DataError::SchemaMismatch(format!("{symbol}: invalid gmtoffset {}", data.meta.gmtoffset))
    })?;

    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();
    let adj_closes = data
        .indicators
        .adjclose
        .and_then(|v| v.into_iter().next())
        .map(|a| a.adjclose)
        .unwrap_or_default();

    let mut bars = TickerBars::default();
    for (i, &ts) in timestamps.iter().enumerate() {
        let stamp = DateTime::from_timestamp(ts, 0)
            .ok_or_else(|| DataError::Parse(format!("{symbol}: invalid timestamp {ts}")))?
            .with_timezone(&offset);

        let row = [
            quote.open.get(i).copied().flatten(),
            quote.high.get(i).copied().flatten(),
            quote.low.get(i).copied().flatten(),
            quote.close.get(i).copied().flatten(),
            adj_closes.get(i).copied().flatten(),
            quote.volume.get(i).copied().flatten().map(|v| v as f64),
        ];

        // Skip rows where every field is missing (holidays/non-trading days)
        if row.iter().all(Option::is_none) {
            continue;
        }

        bars.index.push(stamp);
        for (column, value) in bars.fields.iter_mut().zip(row) {
            column.push(value);
        }
    }

    Ok(bars)
}

fn flat_table(bars: TickerBars) -> RawTable {
    let mut table = RawTable::new(bars.index);
    for (name, values) in FIELDS.iter().zip(bars.fields) {
        table.push_column(ColumnKey::flat(*name), values);
    }
    table
}

/// Align several tickers on the union of their timestamps.
fn ticker_major_table(fetched: Vec<(&str, TickerBars)>) -> RawTable {
    let index: Vec<DateTime<FixedOffset>> = fetched
        .iter()
        .flat_map(|(_, bars)| bars.index.iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut table = RawTable::new(index.clone());
    for (symbol, bars) in fetched {
        let rows: BTreeMap<DateTime<FixedOffset>, usize> = bars
            .index
            .iter()
            .enumerate()
            .map(|(i, ts)| (*ts, i))
            .collect();

        for (name, column) in FIELDS.iter().zip(&bars.fields) {
            let values = index
                .iter()
                .map(|ts| rows.get(ts).and_then(|&i| column[i]))
                .collect();
            table.push_column(ColumnKey::compound([symbol, *name]), values);
        }
    }
    table
}
