//! Schema normalization for price-series responses.
//!
//! Upstream tables arrive in one of several shapes depending on how many
//! tickers were requested and on provider version drift:
//!
//! - flat columns (`Open`, `Close`, ...) for a single ticker
//! - compound `(field, ticker)` columns, "field-major"
//! - compound `(ticker, field)` columns, "ticker-major"
//! - compound keys with the field at some deeper level
//!
//! `classify` maps a table to a closed set of shapes and `Normalizer`
//! dispatches on that shape to project out the value field as one canonical
//! series per ticker. Nothing here fails: unrecognized input yields an empty
//! set.

use std::slice;

use chrono::{DateTime, FixedOffset};
use tracing::debug;

use super::series::{CanonicalSeries, CanonicalSeriesSet};

/// Field holding the close/last value in upstream tables.
pub const CLOSE_FIELD: &str = "Close";

/// Column address: a plain name or a multi-level key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnKey {
    Flat(String),
    Compound(Vec<String>),
}

impl ColumnKey {
    pub fn flat(name: impl Into<String>) -> Self {
        ColumnKey::Flat(name.into())
    }

    pub fn compound<S: Into<String>>(levels: impl IntoIterator<Item = S>) -> Self {
        ColumnKey::Compound(levels.into_iter().map(Into::into).collect())
    }

    /// Key levels; a flat key is a single level.
    pub fn levels(&self) -> &[String] {
        match self {
            ColumnKey::Flat(name) => slice::from_ref(name),
            ColumnKey::Compound(levels) => levels,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawColumn {
    pub key: ColumnKey,
    pub values: Vec<Option<f64>>,
}

/// Raw series response as delivered by a price source.
///
/// The index keeps the upstream UTC offset; normalization drops it.
/// Column value vectors are aligned with `index`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub index: Vec<DateTime<FixedOffset>>,
    pub columns: Vec<RawColumn>,
}

impl RawTable {
    pub fn new(index: Vec<DateTime<FixedOffset>>) -> Self {
        Self {
            index,
            columns: Vec::new(),
        }
    }

    pub fn push_column(&mut self, key: ColumnKey, values: Vec<Option<f64>>) {
        self.columns.push(RawColumn { key, values });
    }

    pub fn with_column(mut self, key: ColumnKey, values: Vec<Option<f64>>) -> Self {
        self.push_column(key, values);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty() || self.columns.is_empty()
    }

    fn is_compound(&self) -> bool {
        self.columns
            .iter()
            .any(|c| matches!(c.key, ColumnKey::Compound(_)))
    }

    fn depth(&self) -> usize {
        self.columns
            .iter()
            .map(|c| c.key.levels().len())
            .max()
            .unwrap_or(0)
    }

    fn has_field_at(&self, field: &str, level: usize) -> bool {
        self.columns
            .iter()
            .any(|c| c.key.levels().get(level).is_some_and(|name| name == field))
    }
}

/// Recognized table layouts, in the priority order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableShape {
    /// No rows or no columns.
    Empty,
    /// Compound keys with the value field at level 0.
    FieldMajor,
    /// Compound keys with the value field at level 1.
    TickerMajor,
    /// Compound keys with the value field at a deeper level.
    OtherLevel(usize),
    /// Compound keys, value field at no level.
    Unrecognized,
    /// Single-level columns including the value field.
    Flat,
    /// Single-level columns without the value field.
    FlatMissingField,
}

/// Classify `table` with respect to the value field `field`.
pub fn classify(table: &RawTable, field: &str) -> TableShape {
    if table.is_empty() {
        return TableShape::Empty;
    }

    if !table.is_compound() {
        return if table.has_field_at(field, 0) {
            TableShape::Flat
        } else {
            TableShape::FlatMissingField
        };
    }

    if table.has_field_at(field, 0) {
        TableShape::FieldMajor
    } else if table.has_field_at(field, 1) {
        TableShape::TickerMajor
    } else if let Some(level) = (2..table.depth()).find(|&l| table.has_field_at(field, l)) {
        TableShape::OtherLevel(level)
    } else {
        TableShape::Unrecognized
    }
}

/// Projects one value field out of any recognized table shape.
#[derive(Debug, Clone)]
pub struct Normalizer {
    field: String,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(CLOSE_FIELD)
    }
}

impl Normalizer {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// Normalize a (possibly absent) raw table into one series per ticker.
    ///
    /// `tickers` are the identifiers that were requested. They only matter
    /// for flat tables, where a single requested ticker names the result.
    pub fn normalize(&self, raw: Option<&RawTable>, tickers: &[&str]) -> CanonicalSeriesSet {
        let Some(table) = raw else {
            return CanonicalSeriesSet::new();
        };

        let shape = classify(table, &self.field);
        debug!(
            ?shape,
            rows = table.index.len(),
            columns = table.columns.len(),
            "classified price table"
        );

        match shape {
            TableShape::Empty | TableShape::Unrecognized | TableShape::FlatMissingField => {
                CanonicalSeriesSet::new()
            }
            TableShape::FieldMajor => self.project(table, 0),
            TableShape::TickerMajor => self.project(table, 1),
            TableShape::OtherLevel(level) => self.project(table, level),
            TableShape::Flat => self.select_flat(table, tickers),
        }
    }

    /// Keep compound columns whose key has the field at `level`, keyed by the
    /// first remaining level.
    fn project(&self, table: &RawTable, level: usize) -> CanonicalSeriesSet {
        let mut set = CanonicalSeriesSet::new();
        for column in &table.columns {
            let levels = column.key.levels();
            if levels.get(level).map(String::as_str) != Some(self.field.as_str()) {
                continue;
            }
            let ticker = levels
                .iter()
                .enumerate()
                .find(|(i, _)| *i != level)
                .map(|(_, name)| name.as_str());
            // A one-level column carrying only the field has no ticker identity.
            let Some(ticker) = ticker else { continue };
            if set.contains(ticker) {
                continue;
            }
            set.insert(column_to_series(ticker, &table.index, &column.values));
        }
        set
    }

    fn select_flat(&self, table: &RawTable, tickers: &[&str]) -> CanonicalSeriesSet {
        let mut set = CanonicalSeriesSet::new();
        let column = table
            .columns
            .iter()
            .find(|c| c.key.levels().first().map(String::as_str) == Some(self.field.as_str()));

        if let Some(column) = column {
            let name = match tickers {
                [only] => *only,
                _ => self.field.as_str(),
            };
            set.insert(column_to_series(name, &table.index, &column.values));
        }
        set
    }
}

/// Normalize with the default close field.
pub fn normalize_close(raw: Option<&RawTable>, tickers: &[&str]) -> CanonicalSeriesSet {
    Normalizer::default().normalize(raw, tickers)
}

/// Pair index with values, dropping missing cells. Timestamps keep their
/// upstream wall-clock time with the offset removed.
fn column_to_series(
    ticker: &str,
    index: &[DateTime<FixedOffset>],
    values: &[Option<f64>],
) -> CanonicalSeries {
    CanonicalSeries::from_points(
        ticker,
        index
            .iter()
            .zip(values)
            .filter_map(|(ts, v)| v.map(|v| (ts.naive_local(), v))),
    )
}
