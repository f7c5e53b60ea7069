//! In-memory sources shared by the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use marketctx_core::data::normalize::{ColumnKey, RawTable};
use marketctx_core::data::{DataError, HttpTransport, Interval, Period, PriceSource};

/// Canned HTTP bodies keyed by a URL substring, with a per-route call count.
#[derive(Default)]
pub struct StubTransport {
    routes: Mutex<Vec<(String, Result<String, DataError>)>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, needle: &str, response: Result<String, DataError>) -> Self {
        self.set(needle, response);
        self
    }

    /// Replace (or add) the response for `needle`.
    pub fn set(&self, needle: &str, response: Result<String, DataError>) {
        let mut routes = self.routes.lock().unwrap();
        routes.retain(|(n, _)| n != needle);
        routes.push((needle.to_string(), response));
    }

    pub fn calls(&self, needle: &str) -> usize {
        self.calls.lock().unwrap().get(needle).copied().unwrap_or(0)
    }
}

impl HttpTransport for StubTransport {
    fn get_text(&self, url: &str) -> Result<String, DataError> {
        let routes = self.routes.lock().unwrap();
        let Some((needle, response)) = routes.iter().find(|(n, _)| url.contains(n.as_str())) else {
            return Err(DataError::Transport(format!("HTTP 404 Not Found for {url}")));
        };
        *self.calls.lock().unwrap().entry(needle.clone()).or_insert(0) += 1;
        response.clone()
    }
}

/// Close prices per ticker, shaped like the Yahoo source shapes them:
/// flat for one ticker, ticker-major compound for several.
#[derive(Default)]
pub struct StubPrices {
    closes: Mutex<HashMap<String, Vec<(DateTime<FixedOffset>, f64)>>>,
    failing: Mutex<BTreeSet<String>>,
    downloads: AtomicUsize,
}

impl StubPrices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, ticker: &str, closes: &[(DateTime<FixedOffset>, f64)]) -> Self {
        self.set(ticker, closes);
        self
    }

    pub fn set(&self, ticker: &str, closes: &[(DateTime<FixedOffset>, f64)]) {
        self.closes
            .lock()
            .unwrap()
            .insert(ticker.to_string(), closes.to_vec());
    }

    /// Make every download that includes `ticker` fail.
    pub fn fail(&self, ticker: &str) {
        self.failing.lock().unwrap().insert(ticker.to_string());
    }

    pub fn recover(&self, ticker: &str) {
        self.failing.lock().unwrap().remove(ticker);
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

impl PriceSource for StubPrices {
    fn name(&self) -> &str {
        "stub"
    }

    fn download(
        &self,
        tickers: &[&str],
        _period: Period,
        _interval: Interval,
    ) -> Result<RawTable, DataError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);

        let failing = self.failing.lock().unwrap();
        if let Some(t) = tickers.iter().find(|t| failing.contains(**t)) {
            return Err(DataError::Transport(format!("HTTP 500 for {t}")));
        }

        let closes = self.closes.lock().unwrap();
        let index: Vec<DateTime<FixedOffset>> = tickers
            .iter()
            .filter_map(|t| closes.get(*t))
            .flat_map(|rows| rows.iter().map(|(ts, _)| *ts))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut table = RawTable::new(index.clone());
        for ticker in tickers {
            let Some(rows) = closes.get(*ticker) else { continue };
            let values: Vec<Option<f64>> = index
                .iter()
                .map(|ts| rows.iter().find(|(t, _)| t == ts).map(|(_, v)| *v))
                .collect();
            if tickers.len() == 1 {
                table.push_column(ColumnKey::flat("Open"), values.clone());
                table.push_column(ColumnKey::flat("Close"), values);
            } else {
                table.push_column(ColumnKey::compound([*ticker, "Open"]), values.clone());
                table.push_column(ColumnKey::compound([*ticker, "Close"]), values);
            }
        }
        Ok(table)
    }
}

/// US Eastern (EDT) market close on 2024-06-`day`.
pub fn close_on(day: u32) -> DateTime<FixedOffset> {
    FixedOffset::west_opt(4 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 6, day, 16, 0, 0)
        .unwrap()
}

/// Consecutive daily closes starting 2024-06-03.
pub fn daily(values: &[f64]) -> Vec<(DateTime<FixedOffset>, f64)> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| (close_on(3 + i as u32), *v))
        .collect()
}

/// Fixed "now" used with `ManualClock`.
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 14, 21, 0, 0).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn fred_csv(rows: &[(&str, &str)]) -> String {
    let mut out = String::from("observation_date,DGS10\n");
    for (d, v) in rows {
        out.push_str(&format!("{d},{v}\n"));
    }
    out
}

pub const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Top stories</title>
<item><title>Treasury yields climb ahead of CPI</title><link>https://example.test/1</link><pubDate>Fri, 14 Jun 2024 12:00:00 +0000</pubDate></item>
<item><title>Gold steadies</title><link>https://example.test/2</link></item>
</channel></rss>"#;
