//! Criterion benchmarks for the data hot paths.
//!
//! Benchmarks:
//! 1. Shape classification + normalization per table layout
//! 2. Wide frame construction from a normalized set
//! 3. Signal evaluation over a full set of inputs

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use chrono::{DateTime, FixedOffset, TimeZone};
use marketctx_core::data::normalize::{normalize_close, ColumnKey, RawTable};
use marketctx_core::signals::{MarketInputs, SignalEngine};

const TICKERS: [&str; 11] = [
    "XLK", "XLF", "XLE", "XLV", "XLU", "XLRE", "XLI", "XLB", "XLP", "XLY", "XLC",
];
const FIELDS: [&str; 6] = ["Open", "High", "Low", "Close", "Adj Close", "Volume"];

// ── Helpers ──────────────────────────────────────────────────────────

fn index(rows: usize) -> Vec<DateTime<FixedOffset>> {
    let tz = FixedOffset::west_opt(4 * 3600).unwrap();
    let start = tz.with_ymd_and_hms(2023, 1, 3, 16, 0, 0).unwrap();
    (0..rows)
        .map(|i| start + chrono::Duration::days(i as i64))
        .collect()
}

fn values(rows: usize, seed: usize) -> Vec<Option<f64>> {
    (0..rows)
        .map(|i| {
            if (i + seed) % 17 == 0 {
                None
            } else {
                Some(100.0 + ((i + seed) as f64 * 0.1).sin() * 10.0)
            }
        })
        .collect()
}

fn table(rows: usize, field_major: bool) -> RawTable {
    let mut table = RawTable::new(index(rows));
    for (t, ticker) in TICKERS.iter().enumerate() {
        for (f, field) in FIELDS.iter().enumerate() {
            let key = if field_major {
                ColumnKey::compound([*field, *ticker])
            } else {
                ColumnKey::compound([*ticker, *field])
            };
            table.push_column(key, values(rows, t * FIELDS.len() + f));
        }
    }
    table
}

fn flat(rows: usize) -> RawTable {
    FIELDS.iter().enumerate().fold(RawTable::new(index(rows)), |t, (f, field)| {
        t.with_column(ColumnKey::flat(*field), values(rows, f))
    })
}

// ── 1. Normalization ─────────────────────────────────────────────────

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    for rows in [22usize, 126, 252] {
        let fm = table(rows, true);
        let tm = table(rows, false);
        let single = flat(rows);

        group.bench_with_input(BenchmarkId::new("field_major", rows), &fm, |b, t| {
            b.iter(|| normalize_close(black_box(Some(t)), &TICKERS))
        });
        group.bench_with_input(BenchmarkId::new("ticker_major", rows), &tm, |b, t| {
            b.iter(|| normalize_close(black_box(Some(t)), &TICKERS))
        });
        group.bench_with_input(BenchmarkId::new("flat", rows), &single, |b, t| {
            b.iter(|| normalize_close(black_box(Some(t)), &["XLK"]))
        });
    }
    group.finish();
}

// ── 2. Frame construction ────────────────────────────────────────────

fn bench_to_frame(c: &mut Criterion) {
    let set = normalize_close(Some(&table(252, false)), &TICKERS);
    c.bench_function("to_frame_11x252", |b| b.iter(|| black_box(&set).to_frame()));
}

// ── 3. Signals ───────────────────────────────────────────────────────

fn bench_signals(c: &mut Criterion) {
    let set = normalize_close(Some(&table(22, false)), &TICKERS);
    let engine = SignalEngine::default();
    let inputs = MarketInputs {
        ten_year_yield: set.get("XLF"),
        commodity: set.get("XLB"),
        volatility: set.get("XLV"),
        growth_sector: set.get("XLK"),
        defensive_sector: set.get("XLU"),
    };
    c.bench_function("signal_evaluate", |b| {
        b.iter(|| engine.evaluate(black_box(&inputs)))
    });
}

criterion_group!(benches, bench_normalize, bench_to_frame, bench_signals);
criterion_main!(benches);
