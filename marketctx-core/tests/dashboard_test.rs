//! Dashboard operations over in-memory sources: caching, per-section
//! degradation, sector changes and signals.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{daily, fred_csv, test_now, StubPrices, StubTransport, RSS};
use marketctx_core::dashboard::Section;
use marketctx_core::data::{DataError, Interval, ManualClock, Period, TtlCache};
use marketctx_core::signals::engine::{
    DEFENSIVE_BID, GROWTH_HEADWIND, NEUTRAL_GUIDANCE, PREMIUM_RICH, RISK_OFF_TONE, SECTOR_WEAK,
    VOLATILITY_GUIDANCE,
};
use marketctx_core::{Dashboard, DashboardConfig};

struct Fixture {
    transport: Arc<StubTransport>,
    prices: Arc<StubPrices>,
    clock: Arc<ManualClock>,
    dashboard: Dashboard,
}

fn fixture(transport: StubTransport, prices: StubPrices) -> Fixture {
    let transport = Arc::new(transport);
    let prices = Arc::new(prices);
    let clock = Arc::new(ManualClock::new(test_now()));
    let dashboard = Dashboard::with_parts(
        DashboardConfig::default(),
        transport.clone(),
        prices.clone(),
        TtlCache::with_clock(clock.clone()),
    );
    Fixture {
        transport,
        prices,
        clock,
        dashboard,
    }
}

/// Gold up 3%, VIX 22.5, tech down 2%, utilities up 1%, yield 4.40.
fn stressed_market() -> (StubTransport, StubPrices) {
    let transport = StubTransport::new()
        .route("rss", Ok(RSS.to_string()))
        .route("fredgraph", Ok(fred_csv(&[("2024-06-12", "4.38"), ("2024-06-13", "4.40")])));
    let prices = StubPrices::new()
        .with("GC=F", &daily(&[2300.0, 2320.0, 2369.0]))
        .with("^VIX", &daily(&[15.0, 18.0, 22.5]))
        .with("XLK", &daily(&[210.0, 200.0, 196.0]))
        .with("XLU", &daily(&[70.0, 70.0, 70.7]))
        .with("XLE", &daily(&[90.0, 91.0, 91.91]));
    (transport, prices)
}

#[test]
fn price_series_is_cached_within_ttl() {
    let f = fixture(StubTransport::new(), StubPrices::new().with("XLK", &daily(&[1.0, 2.0])));

    let a = f
        .dashboard
        .price_series(&["XLK"], Period::FiveDays, Interval::OneDay)
        .unwrap();
    let b = f
        .dashboard
        .price_series(&["XLK"], Period::FiveDays, Interval::OneDay)
        .unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(f.prices.downloads(), 1);

    // Different arguments are a different entry.
    f.dashboard
        .price_series(&["XLK"], Period::OneMonth, Interval::OneDay)
        .unwrap();
    assert_eq!(f.prices.downloads(), 2);
}

#[test]
fn price_series_recomputes_after_expiry() {
    let f = fixture(StubTransport::new(), StubPrices::new().with("XLK", &daily(&[1.0, 2.0])));
    let args = (&["XLK"][..], Period::FiveDays, Interval::OneDay);

    let first = f.dashboard.price_series(args.0, args.1, args.2).unwrap();
    f.clock.advance(Duration::from_secs(599));
    f.dashboard.price_series(args.0, args.1, args.2).unwrap();
    assert_eq!(f.prices.downloads(), 1);

    f.clock.advance(Duration::from_secs(2));
    f.prices.set("XLK", &daily(&[1.0, 2.0, 3.0]));
    let refreshed = f.dashboard.price_series(args.0, args.1, args.2).unwrap();
    assert_eq!(f.prices.downloads(), 2);
    assert!(!Arc::ptr_eq(&first, &refreshed));
    assert_eq!(refreshed.get("XLK").unwrap().len(), 3);
}

#[test]
fn failures_are_not_cached() {
    let f = fixture(StubTransport::new(), StubPrices::new().with("XLK", &daily(&[1.0, 2.0])));
    f.prices.fail("XLK");

    let err = f
        .dashboard
        .price_series(&["XLK"], Period::FiveDays, Interval::OneDay)
        .unwrap_err();
    assert!(matches!(err, DataError::Transport(_)));
    assert!(f.dashboard.cache().is_empty());

    f.prices.recover("XLK");
    let set = f
        .dashboard
        .price_series(&["XLK"], Period::FiveDays, Interval::OneDay)
        .unwrap();
    assert_eq!(set.len(), 1);
    assert_eq!(f.prices.downloads(), 2);
}

#[test]
fn news_is_cached_and_failure_becomes_an_item() {
    let f = fixture(
        StubTransport::new().route("rss", Err(DataError::Transport("HTTP 502".into()))),
        StubPrices::new(),
    );

    let items = f.dashboard.news();
    assert_eq!(items.len(), 1);
    assert!(items[0].title.starts_with("RSS error:"));
    assert!(items[0].title.contains("HTTP 502"));

    // The failure was not cached; the feed recovers on the next call.
    f.transport.set("rss", Ok(RSS.to_string()));
    let items = f.dashboard.news();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].title, "Treasury yields climb ahead of CPI");
    assert_eq!(items[1].published, "");

    f.dashboard.news();
    assert_eq!(f.transport.calls("rss"), 2);
}

#[test]
fn feed_without_items_becomes_an_error_item() {
    let f = fixture(
        StubTransport::new().route("rss", Ok("<rss><channel></channel></rss>".into())),
        StubPrices::new(),
    );
    let items = f.dashboard.news();
    assert_eq!(items.len(), 1);
    assert!(items[0].title.contains("no items"));
}

#[test]
fn haven_assets_use_aliases_and_window_change() {
    let (transport, prices) = stressed_market();
    let f = fixture(transport, prices);

    let haven = f.dashboard.haven_assets().unwrap();
    assert!(haven.series.contains("Gold"));
    assert!(haven.series.contains("VIX"));
    assert!(!haven.series.contains("GC=F"));

    let names: Vec<&str> = haven.changes.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Gold", "VIX"]);
    assert!((haven.changes[0].change_pct - 3.0).abs() < 1e-9);
    assert!((haven.changes[1].change_pct - 50.0).abs() < 1e-9);
}

#[test]
fn haven_without_data_is_an_error() {
    let f = fixture(StubTransport::new(), StubPrices::new());
    assert!(matches!(
        f.dashboard.haven_assets(),
        Err(DataError::SchemaMismatch(_))
    ));
}

#[test]
fn sector_changes_follow_config_order_and_skip_missing() {
    let (transport, prices) = stressed_market();
    let f = fixture(transport, prices);

    let changes = f.dashboard.sector_changes();
    let names: Vec<&str> = changes.iter().map(|c| c.name.as_str()).collect();
    // Tech, Energy and Utilities have data; the rest are omitted.
    assert_eq!(names, vec!["Tech", "Energy", "Utilities"]);
    assert_eq!(changes[0].change_pct, -2.0);
    assert_eq!(changes[1].change_pct, 1.0);
    assert_eq!(changes[2].change_pct, 1.0);
    assert_eq!(changes[0].ticker, "XLK");
}

#[test]
fn sector_with_one_point_is_omitted() {
    let f = fixture(StubTransport::new(), StubPrices::new().with("XLF", &daily(&[40.0])));
    assert!(f.dashboard.sector_changes().is_empty());
}

#[test]
fn sector_with_zero_close_is_omitted() {
    let prices = StubPrices::new()
        .with("XLF", &daily(&[40.0, 0.0, 5.0]))
        .with("XLK", &daily(&[210.0, 200.0, 196.0]));
    let f = fixture(StubTransport::new(), prices);

    let changes = f.dashboard.sector_changes();
    let names: Vec<&str> = changes.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Tech"]);
    assert!(changes.iter().all(|c| c.change_pct.is_finite()));
}

#[test]
fn haven_with_zero_first_close_has_no_window_change() {
    let prices = StubPrices::new()
        .with("GC=F", &daily(&[0.0, 2320.0, 2369.0]))
        .with("^VIX", &daily(&[15.0, 18.0, 22.5]));
    let f = fixture(StubTransport::new(), prices);

    let haven = f.dashboard.haven_assets().unwrap();
    assert!(haven.series.contains("Gold"));
    let names: Vec<&str> = haven.changes.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["VIX"]);

    // The commodity signal is dropped with it; VIX still reports.
    let report = f.dashboard.signals();
    assert!(report.signals.iter().all(|s| !s.value.contains("inf")));
    assert!(report.signals.iter().all(|s| s.indicator != "Gold"));
    assert!(report.signals.iter().any(|s| s.label == PREMIUM_RICH));
}

#[test]
fn signals_cover_every_stressed_indicator() {
    let (transport, prices) = stressed_market();
    let f = fixture(transport, prices);

    let report = f.dashboard.signals();
    let labels: Vec<&str> = report.signals.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(
        labels,
        vec![GROWTH_HEADWIND, RISK_OFF_TONE, PREMIUM_RICH, SECTOR_WEAK, DEFENSIVE_BID]
    );
    assert_eq!(report.signals[0].value, "4.40%");
    assert_eq!(report.signals[2].value, "22.50");
    assert!(report.guidance.contains(VOLATILITY_GUIDANCE));
}

#[test]
fn signals_with_nothing_available_are_neutral() {
    let f = fixture(StubTransport::new(), StubPrices::new());
    let report = f.dashboard.signals();
    assert!(report.signals.is_empty());
    assert_eq!(report.guidance, NEUTRAL_GUIDANCE);
}

#[test]
fn snapshot_sections_degrade_independently() {
    let (_, prices) = stressed_market();
    // News and both yield sources fail; prices are fine apart from ^TNX.
    let transport = StubTransport::new()
        .route("rss", Err(DataError::Transport("offline".into())))
        .route("fredgraph", Err(DataError::Transport("offline".into())));
    let f = fixture(transport, prices);

    let snapshot = f.dashboard.snapshot();
    assert_eq!(snapshot.generated_at, test_now());
    assert_eq!(snapshot.news.len(), 1);
    assert!(snapshot.news[0].title.starts_with("RSS error:"));

    match &snapshot.ten_year_yield {
        Section::Unavailable { reason } => assert!(reason.contains("all sources failed")),
        Section::Ready(_) => panic!("yield should be unavailable"),
    }
    assert!(snapshot.haven.is_ready());
    assert_eq!(snapshot.sectors.ready().map(Vec::len), Some(3));

    // Yield signal missing, the other four present.
    assert_eq!(snapshot.signals.signals.len(), 4);
    assert_eq!(snapshot.signals.signals[0].label, RISK_OFF_TONE);
}

#[test]
fn snapshot_fetches_each_input_once() {
    let (transport, prices) = stressed_market();
    let f = fixture(transport, prices);

    f.dashboard.snapshot();
    // 11 sectors (one download each) plus one haven download.
    assert_eq!(f.prices.downloads(), 12);
    assert_eq!(f.transport.calls("fredgraph"), 1);
    assert_eq!(f.transport.calls("rss"), 1);

    // A second pass inside the TTL is served from cache.
    f.dashboard.snapshot();
    assert_eq!(f.prices.downloads(), 12);
    assert_eq!(f.transport.calls("fredgraph"), 1);
}

#[test]
fn snapshot_serializes_for_the_render_boundary() {
    let (transport, prices) = stressed_market();
    let f = fixture(transport, prices);

    let json = serde_json::to_value(f.dashboard.snapshot()).unwrap();
    assert_eq!(json["ten_year_yield"]["status"], "ready");
    assert_eq!(json["ten_year_yield"]["data"]["source"], "fred");
    assert_eq!(json["sectors"]["data"][0]["name"], "Tech");
    assert_eq!(json["signals"]["signals"].as_array().map(Vec::len), Some(5));
}
