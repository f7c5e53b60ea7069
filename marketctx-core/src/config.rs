//! Serializable dashboard configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config.
//! Sections:
//! - `sources`: upstream URLs, timeouts and the 10Y yield fallback chain
//! - `cache`: TTLs per operation family
//! - `thresholds`: signal classification cutoffs
//! - `sectors` / `haven`: which instruments each dashboard section tracks

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::fred::DEFAULT_FRED_URL;
use crate::data::news::DEFAULT_NEWS_URL;
use crate::data::provider::{Interval, Period};
use crate::data::transport::DEFAULT_USER_AGENT;
use crate::data::yahoo::DEFAULT_BASE_URL;
use crate::signals::engine::DEFAULT_SECTOR_LOOKBACK;
use crate::signals::SignalThresholds;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub sources: SourceConfig,
    pub cache: CacheConfig,
    pub thresholds: SignalThresholds,
    pub sectors: SectorConfig,
    pub haven: HavenConfig,
}

impl DashboardConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sources.validate()?;
        self.cache.validate()?;
        self.thresholds.validate().map_err(ConfigError::Invalid)?;
        self.sectors.validate()?;
        self.haven.validate()
    }
}

fn non_empty(name: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{name} must not be empty")));
    }
    Ok(())
}

fn positive(name: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid(format!("{name} must be positive")));
    }
    Ok(())
}

/// Upstream endpoints and the yield fallback chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub news_url: String,
    /// Headlines kept from the feed.
    pub news_limit: usize,
    pub fred_url: String,
    pub fred_series: String,
    /// Trailing window applied to the FRED series, in days.
    pub yield_window_days: i64,
    pub yahoo_base_url: String,
    /// Proxy instrument quoted at `yield_proxy_scale` times the yield.
    pub yield_proxy_ticker: String,
    pub yield_proxy_scale: f64,
    pub yield_proxy_period: Period,
    pub yield_proxy_interval: Interval,
    /// Points of the yield series kept for display.
    pub yield_display_points: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            news_url: DEFAULT_NEWS_URL.to_string(),
            news_limit: 8,
            fred_url: DEFAULT_FRED_URL.to_string(),
            fred_series: "DGS10".to_string(),
            yield_window_days: 120,
            yahoo_base_url: DEFAULT_BASE_URL.to_string(),
            yield_proxy_ticker: "^TNX".to_string(),
            yield_proxy_scale: 10.0,
            yield_proxy_period: Period::SixMonths,
            yield_proxy_interval: Interval::OneDay,
            yield_display_points: 90,
            timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        non_empty("sources.news_url", &self.news_url)?;
        non_empty("sources.fred_url", &self.fred_url)?;
        non_empty("sources.fred_series", &self.fred_series)?;
        non_empty("sources.yahoo_base_url", &self.yahoo_base_url)?;
        non_empty("sources.yield_proxy_ticker", &self.yield_proxy_ticker)?;
        positive("sources.timeout_secs", self.timeout_secs)?;
        positive("sources.news_limit", self.news_limit as u64)?;
        positive("sources.yield_display_points", self.yield_display_points as u64)?;
        if self.yield_window_days <= 0 {
            return Err(ConfigError::Invalid(
                "sources.yield_window_days must be positive".into(),
            ));
        }
        if !self.yield_proxy_scale.is_finite() || self.yield_proxy_scale == 0.0 {
            return Err(ConfigError::Invalid(format!(
                "sources.yield_proxy_scale must be finite and non-zero, got {}",
                self.yield_proxy_scale
            )));
        }
        Ok(())
    }
}

/// Time-to-live per operation family, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub series_ttl_secs: u64,
    pub news_ttl_secs: u64,
    pub yield_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            series_ttl_secs: 600,
            news_ttl_secs: 600,
            yield_ttl_secs: 900,
        }
    }
}

impl CacheConfig {
    pub fn series_ttl(&self) -> Duration {
        Duration::from_secs(self.series_ttl_secs)
    }

    pub fn news_ttl(&self) -> Duration {
        Duration::from_secs(self.news_ttl_secs)
    }

    pub fn yield_ttl(&self) -> Duration {
        Duration::from_secs(self.yield_ttl_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        positive("cache.series_ttl_secs", self.series_ttl_secs)?;
        positive("cache.news_ttl_secs", self.news_ttl_secs)?;
        positive("cache.yield_ttl_secs", self.yield_ttl_secs)
    }
}

/// A named instrument (sector ETF or haven asset).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub name: String,
    pub ticker: String,
}

impl Instrument {
    pub fn new(name: impl Into<String>, ticker: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ticker: ticker.into(),
        }
    }
}

/// Sector tracking. Sectors are fetched one ticker at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectorConfig {
    /// Display order of the sector table.
    pub sectors: Vec<Instrument>,
    pub period: Period,
    pub interval: Interval,
    /// Trailing points considered for the one-period change.
    pub lookback_points: usize,
    /// Sector proxy feeding the growth signal.
    pub growth_ticker: String,
    /// Sector proxy feeding the defensive signal.
    pub defensive_ticker: String,
}

impl Default for SectorConfig {
    fn default() -> Self {
        let sectors = [
            ("Tech", "XLK"),
            ("Financials", "XLF"),
            ("Energy", "XLE"),
            ("Healthcare", "XLV"),
            ("Utilities", "XLU"),
            ("Real Estate", "XLRE"),
            ("Industrials", "XLI"),
            ("Materials", "XLB"),
            ("Consumer Staples", "XLP"),
            ("Discretionary", "XLY"),
            ("Comm Services", "XLC"),
        ]
        .into_iter()
        .map(|(name, ticker)| Instrument::new(name, ticker))
        .collect();

        Self {
            sectors,
            period: Period::FiveDays,
            interval: Interval::OneDay,
            lookback_points: DEFAULT_SECTOR_LOOKBACK,
            growth_ticker: "XLK".to_string(),
            defensive_ticker: "XLU".to_string(),
        }
    }
}

impl SectorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.lookback_points < 2 {
            return Err(ConfigError::Invalid(format!(
                "sectors.lookback_points must be at least 2, got {}",
                self.lookback_points
            )));
        }
        non_empty("sectors.growth_ticker", &self.growth_ticker)?;
        non_empty("sectors.defensive_ticker", &self.defensive_ticker)?;
        for sector in &self.sectors {
            non_empty("sectors.sectors.name", &sector.name)?;
            non_empty("sectors.sectors.ticker", &sector.ticker)?;
        }
        Ok(())
    }
}

/// Safe-haven assets shown together and fed to the commodity/volatility signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HavenConfig {
    pub commodity: Instrument,
    pub volatility: Instrument,
    pub period: Period,
    pub interval: Interval,
}

impl Default for HavenConfig {
    fn default() -> Self {
        Self {
            commodity: Instrument::new("Gold", "GC=F"),
            volatility: Instrument::new("VIX", "^VIX"),
            period: Period::OneMonth,
            interval: Interval::OneDay,
        }
    }
}

impl HavenConfig {
    /// `(ticker, alias)` pairs in display order.
    pub fn aliases(&self) -> [(&str, &str); 2] {
        [
            (self.commodity.ticker.as_str(), self.commodity.name.as_str()),
            (self.volatility.ticker.as_str(), self.volatility.name.as_str()),
        ]
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for asset in [&self.commodity, &self.volatility] {
            non_empty("haven.name", &asset.name)?;
            non_empty("haven.ticker", &asset.ticker)?;
        }
        if self.commodity.name == self.volatility.name {
            return Err(ConfigError::Invalid(format!(
                "haven assets need distinct names, both are {:?}",
                self.commodity.name
            )));
        }
        Ok(())
    }
}
