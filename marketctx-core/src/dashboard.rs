//! Dashboard service: wires sources, cache, fallback chain and signal engine
//! together and assembles the render-boundary snapshot.
//!
//! Each section degrades on its own. A failed yield fetch shows up as an
//! unavailable section and a missing yield signal; news, haven assets and
//! sectors render regardless.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{DashboardConfig, Instrument};
use crate::data::cache::TtlCache;
use crate::data::fallback::{FallbackChain, ProxySeriesSource, SourcedSeries};
use crate::data::fred::FredCsvSource;
use crate::data::news::{NewsItem, RssFeed};
use crate::data::normalize::normalize_close;
use crate::data::provider::{DataError, HttpTransport, Interval, Period, PriceSource};
use crate::data::series::{CanonicalSeries, CanonicalSeriesSet};
use crate::data::transport::ReqwestTransport;
use crate::data::yahoo::YahooPriceSource;
use crate::signals::{MarketInputs, SignalEngine, SignalReport};

/// Indicator name used in fallback errors and logs.
pub const YIELD_INDICATOR: &str = "10Y Treasury yield";

/// Ticker carried by the resolved yield series, whichever source produced it.
pub const YIELD_TICKER: &str = "ten_year_yield";

const OP_NEWS: &str = "news";
const OP_YIELD: &str = "ten_year_yield";
const OP_SERIES: &str = "price_series";

/// One section of the snapshot: either data or the reason it is missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Section<T> {
    Ready(T),
    Unavailable { reason: String },
}

impl<T> Section<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Section::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Section::Ready(value) => Some(value),
            Section::Unavailable { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Section::Ready(_))
    }
}

impl<T> From<Result<T, DataError>> for Section<T> {
    fn from(result: Result<T, DataError>) -> Self {
        match result {
            Ok(value) => Section::Ready(value),
            Err(e) => Section::unavailable(e.to_string()),
        }
    }
}

/// Window change of one haven asset, keyed by its display alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowChange {
    pub name: String,
    pub change_pct: f64,
}

/// Haven assets renamed to their aliases plus first-to-last change each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HavenAssets {
    pub series: CanonicalSeriesSet,
    pub changes: Vec<WindowChange>,
}

/// One-period change of a sector ETF, rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorChange {
    pub name: String,
    pub ticker: String,
    pub change_pct: f64,
}

/// Everything the presentation layer renders in one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub generated_at: DateTime<Utc>,
    /// Never empty: failures become a single descriptive item.
    pub news: Vec<NewsItem>,
    pub ten_year_yield: Section<SourcedSeries>,
    pub haven: Section<HavenAssets>,
    pub sectors: Section<Vec<SectorChange>>,
    pub signals: SignalReport,
}

type SetResult = Result<Arc<CanonicalSeriesSet>, DataError>;

/// Raw fetch results for one rendering pass, shared between sections and signals.
struct Collected {
    ten_year_yield: Result<SourcedSeries, DataError>,
    haven: SetResult,
    sectors: Vec<(Instrument, SetResult)>,
    growth: Option<Arc<CanonicalSeriesSet>>,
    defensive: Option<Arc<CanonicalSeriesSet>>,
}

pub struct Dashboard {
    config: DashboardConfig,
    transport: Arc<dyn HttpTransport>,
    prices: Arc<dyn PriceSource>,
    cache: TtlCache,
    engine: SignalEngine,
}

impl Dashboard {
    /// Dashboard backed by live HTTP sources and the system clock.
    pub fn new(config: DashboardConfig) -> Result<Self, DataError> {
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(
            config.sources.timeout(),
            &config.sources.user_agent,
        )?);
        let prices = Arc::new(YahooPriceSource::new(
            transport.clone(),
            config.sources.yahoo_base_url.clone(),
        ));
        Ok(Self::with_parts(config, transport, prices, TtlCache::new()))
    }

    pub fn with_parts(
        config: DashboardConfig,
        transport: Arc<dyn HttpTransport>,
        prices: Arc<dyn PriceSource>,
        cache: TtlCache,
    ) -> Self {
        let engine = SignalEngine::new(config.thresholds.clone())
            .with_sector_lookback(config.sectors.lookback_points);
        Self {
            config,
            transport,
            prices,
            cache,
            engine,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    /// Latest headlines. Failures are not cached and come back as one
    /// error-describing item.
    pub fn news(&self) -> Arc<Vec<NewsItem>> {
        let src = &self.config.sources;
        let result = self.cache.get_or_try_compute(
            OP_NEWS,
            &(src.news_url.as_str(), src.news_limit),
            self.config.cache.news_ttl(),
            || RssFeed::new(self.transport.clone(), src.news_url.clone(), src.news_limit).fetch(),
        );
        result.unwrap_or_else(|e| {
            warn!(error = %e, "news unavailable");
            Arc::new(vec![NewsItem::from_error(&e)])
        })
    }

    /// Full yield series as resolved by the fallback chain (cached).
    fn resolve_yield(&self) -> Result<Arc<SourcedSeries>, DataError> {
        let src = &self.config.sources;
        let args = (
            src.fred_url.as_str(),
            src.fred_series.as_str(),
            src.yield_window_days,
            src.yield_proxy_ticker.as_str(),
            src.yield_proxy_scale,
        );
        self.cache
            .get_or_try_compute(OP_YIELD, &args, self.config.cache.yield_ttl(), || {
                FallbackChain::new(YIELD_INDICATOR)
                    .then(FredCsvSource::new(
                        self.transport.clone(),
                        src.fred_url.clone(),
                        src.fred_series.clone(),
                        src.yield_window_days,
                        YIELD_TICKER,
                    ))
                    .then(ProxySeriesSource::new(
                        self.prices.clone(),
                        src.yield_proxy_ticker.clone(),
                        src.yield_proxy_period,
                        src.yield_proxy_interval,
                        src.yield_proxy_scale,
                        YIELD_TICKER,
                    ))
                    .resolve(self.cache.clock().now())
            })
    }

    /// 10-year yield in percent, trimmed to the display window.
    pub fn ten_year_yield(&self) -> Result<SourcedSeries, DataError> {
        let resolved = self.resolve_yield()?;
        Ok(SourcedSeries {
            series: resolved
                .series
                .tail(self.config.sources.yield_display_points),
            source: resolved.source,
        })
    }

    /// Close series for `tickers`, normalized and cached per argument set.
    pub fn price_series(
        &self,
        tickers: &[&str],
        period: Period,
        interval: Interval,
    ) -> Result<Arc<CanonicalSeriesSet>, DataError> {
        self.cache.get_or_try_compute(
            OP_SERIES,
            &(tickers, period, interval),
            self.config.cache.series_ttl(),
            || {
                let raw = self.prices.download(tickers, period, interval)?;
                let set = normalize_close(Some(&raw), tickers);
                info!(
                    provider = self.prices.name(),
                    requested = tickers.len(),
                    returned = set.len(),
                    "price series fetched"
                );
                Ok(set)
            },
        )
    }

    fn haven_set(&self) -> SetResult {
        let haven = &self.config.haven;
        let tickers = [
            haven.commodity.ticker.as_str(),
            haven.volatility.ticker.as_str(),
        ];
        self.price_series(&tickers, haven.period, haven.interval)
    }

    fn sector_set(&self, ticker: &str) -> SetResult {
        let sectors = &self.config.sectors;
        self.price_series(&[ticker], sectors.period, sectors.interval)
    }

    /// Gold and VIX (by alias) with their window changes.
    pub fn haven_assets(&self) -> Result<HavenAssets, DataError> {
        self.haven_from(self.haven_set())
    }

    fn haven_from(&self, raw: SetResult) -> Result<HavenAssets, DataError> {
        let raw = raw?;
        let aliases = self.config.haven.aliases();
        let series = raw.renamed(&aliases);
        if series.is_empty() {
            return Err(DataError::SchemaMismatch(
                "no haven asset data returned".to_string(),
            ));
        }
        let changes = aliases
            .iter()
            .filter_map(|(_, alias)| {
                let change_pct = series.get(alias)?.pct_change_first_last()?;
                Some(WindowChange {
                    name: alias.to_string(),
                    change_pct,
                })
            })
            .collect();
        Ok(HavenAssets { series, changes })
    }

    /// One-period change for every configured sector with enough data, in
    /// configured order.
    pub fn sector_changes(&self) -> Vec<SectorChange> {
        self.changes_from(&self.fetch_sectors())
    }

    fn fetch_sectors(&self) -> Vec<(Instrument, SetResult)> {
        self.config
            .sectors
            .sectors
            .iter()
            .map(|sector| (sector.clone(), self.sector_set(&sector.ticker)))
            .collect()
    }

    fn changes_from(&self, fetched: &[(Instrument, SetResult)]) -> Vec<SectorChange> {
        let lookback = self.config.sectors.lookback_points;
        fetched
            .iter()
            .filter_map(|(sector, result)| {
                let set = match result {
                    Ok(set) => set,
                    Err(e) => {
                        warn!(sector = %sector.name, error = %e, "sector fetch failed");
                        return None;
                    }
                };
                let change = set
                    .get_or_sole(&sector.ticker)?
                    .pct_change_last_period(lookback)?;
                Some(SectorChange {
                    name: sector.name.clone(),
                    ticker: sector.ticker.clone(),
                    change_pct: round2(change),
                })
            })
            .collect()
    }

    /// Current signals and guidance.
    pub fn signals(&self) -> SignalReport {
        let collected = self.collect(Vec::new());
        self.evaluate(&collected)
    }

    /// Every section plus signals, fetching each input once.
    pub fn snapshot(&self) -> DashboardSnapshot {
        let generated_at = self.cache.clock().now();
        let news = Vec::clone(&self.news());
        let collected = self.collect(self.fetch_sectors());
        let signals = self.evaluate(&collected);

        let ten_year_yield = match &collected.ten_year_yield {
            Ok(y) if y.series.is_empty() => {
                Section::unavailable("no observations in the trailing window")
            }
            other => Section::from(other.clone()),
        };
        let haven = Section::from(self.haven_from(collected.haven.clone()));
        let changes = self.changes_from(&collected.sectors);
        let sectors = if changes.is_empty() {
            Section::unavailable("no sector data available")
        } else {
            Section::Ready(changes)
        };

        info!(
            yield_ready = ten_year_yield.is_ready(),
            haven_ready = haven.is_ready(),
            sectors_ready = sectors.is_ready(),
            signals = signals.signals.len(),
            "snapshot assembled"
        );

        DashboardSnapshot {
            generated_at,
            news,
            ten_year_yield,
            haven,
            sectors,
            signals,
        }
    }

    fn collect(&self, sectors: Vec<(Instrument, SetResult)>) -> Collected {
        let ten_year_yield = self.ten_year_yield();
        if let Err(e) = &ten_year_yield {
            warn!(error = %e, "yield unavailable");
        }
        let haven = self.haven_set();
        let growth = self.sector_input(&sectors, &self.config.sectors.growth_ticker);
        let defensive = self.sector_input(&sectors, &self.config.sectors.defensive_ticker);
        Collected {
            ten_year_yield,
            haven,
            sectors,
            growth,
            defensive,
        }
    }

    /// Reuse a sector already fetched this pass, otherwise fetch it.
    fn sector_input(
        &self,
        fetched: &[(Instrument, SetResult)],
        ticker: &str,
    ) -> Option<Arc<CanonicalSeriesSet>> {
        match fetched.iter().find(|(sector, _)| sector.ticker == ticker) {
            Some((_, result)) => result.as_ref().ok().cloned(),
            None => self.sector_set(ticker).ok(),
        }
    }

    fn evaluate(&self, collected: &Collected) -> SignalReport {
        let haven = &self.config.haven;
        let haven_set = collected.haven.as_ref().ok();
        let pick = |set: Option<&Arc<CanonicalSeriesSet>>, ticker: &str| -> Option<CanonicalSeries> {
            set.and_then(|s| s.get(ticker)).cloned()
        };

        let commodity = pick(haven_set, &haven.commodity.ticker);
        let volatility = pick(haven_set, &haven.volatility.ticker);
        let growth = collected
            .growth
            .as_ref()
            .and_then(|s| s.get_or_sole(&self.config.sectors.growth_ticker).cloned());
        let defensive = collected
            .defensive
            .as_ref()
            .and_then(|s| s.get_or_sole(&self.config.sectors.defensive_ticker).cloned());

        let inputs = MarketInputs {
            ten_year_yield: collected.ten_year_yield.as_ref().ok().map(|y| &y.series),
            commodity: commodity.as_ref(),
            volatility: volatility.as_ref(),
            growth_sector: growth.as_ref(),
            defensive_sector: defensive.as_ref(),
        };
        self.engine.evaluate(&inputs)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
