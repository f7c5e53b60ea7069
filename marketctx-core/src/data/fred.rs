//! FRED graph CSV source (primary source for the 10-year yield).
//!
//! The document is a two-column CSV: a date column and a series column named
//! after the FRED series id (e.g. `DGS10`). Values are already in percent.
//! FRED writes `.` on market holidays; such rows fail to parse and are
//! dropped rather than failing the fetch.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tracing::debug;

use super::fallback::IndicatorSource;
use super::provider::{DataError, DataSource, HttpTransport};
use super::series::CanonicalSeries;

pub const DEFAULT_FRED_URL: &str = "https://fred.stlouisfed.org/graph/fredgraph.csv";

/// Accepted headers for the date column (`DATE` on older exports).
pub const DATE_COLUMNS: [&str; 2] = ["DATE", "observation_date"];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// Fetches one FRED series and keeps a trailing window of it.
pub struct FredCsvSource {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    series_id: String,
    window_days: i64,
    output_ticker: String,
}

impl FredCsvSource {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        base_url: impl Into<String>,
        series_id: impl Into<String>,
        window_days: i64,
        output_ticker: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            series_id: series_id.into(),
            window_days,
            output_ticker: output_ticker.into(),
        }
    }

    pub fn url(&self) -> String {
        format!("{}?id={}", self.base_url, self.series_id)
    }
}

impl IndicatorSource for FredCsvSource {
    fn source(&self) -> DataSource {
        DataSource::Fred
    }

    fn fetch(&self, now: DateTime<Utc>) -> Result<CanonicalSeries, DataError> {
        let body = self.transport.get_text(&self.url())?;
        let cutoff = (now - Duration::days(self.window_days)).naive_utc();
        parse_fred_csv(&body, &self.series_id, cutoff, &self.output_ticker)
    }
}

/// Parse a FRED CSV document into a series, keeping rows on or after `cutoff`.
///
/// Missing columns and unreadable documents are errors. Individual rows that
/// fail to parse are dropped. An empty result is a success.
pub fn parse_fred_csv(
    body: &str,
    value_column: &str,
    cutoff: NaiveDateTime,
    ticker: &str,
) -> Result<CanonicalSeries, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| DataError::Parse(format!("FRED CSV header: {e}")))?
        .clone();

    let date_idx = headers
        .iter()
        .position(|h| DATE_COLUMNS.contains(&h))
        .ok_or_else(|| DataError::SchemaMismatch("FRED CSV missing date column".into()))?;
    let value_idx = headers
        .iter()
        .position(|h| h == value_column)
        .ok_or_else(|| {
            DataError::SchemaMismatch(format!("FRED CSV missing '{value_column}' column"))
        })?;

    let mut series = CanonicalSeries::new(ticker);
    let mut dropped = 0usize;

    for record in reader.records() {
        let record = record.map_err(|e| DataError::Parse(format!("FRED CSV row: {e}")))?;

        let date = record.get(date_idx).and_then(parse_date);
        let value = record
            .get(value_idx)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite());

        match date.zip(value) {
            Some((date, value)) => {
                series.insert(date, value);
            }
            None => dropped += 1,
        }
    }
    series.retain_since(cutoff);

    debug!(kept = series.len(), dropped, "parsed FRED CSV");
    Ok(series)
}

fn parse_date(text: &str) -> Option<NaiveDateTime> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .map(|d| d.and_time(NaiveTime::MIN))
}
