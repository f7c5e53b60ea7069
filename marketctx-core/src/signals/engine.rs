//! Signal engine: latest values and recent changes → labels + guidance.

use serde::{Deserialize, Serialize};

use super::thresholds::SignalThresholds;
use super::Signal;
use crate::data::series::CanonicalSeries;

pub const YIELD_INDICATOR: &str = "10Y Yield";
pub const COMMODITY_INDICATOR: &str = "Gold";
pub const VOLATILITY_INDICATOR: &str = "VIX";
pub const GROWTH_INDICATOR: &str = "Growth Sector";
pub const DEFENSIVE_INDICATOR: &str = "Defensive Sector";

pub const GROWTH_HEADWIND: &str = "growth headwind";
pub const RATES_SUPPORTIVE: &str = "rates supportive";
pub const RISK_OFF_TONE: &str = "risk-off tone";
pub const CALM: &str = "calm";
pub const PREMIUM_RICH: &str = "premium rich";
pub const PREMIUM_THIN: &str = "premium thin";
pub const SECTOR_WEAK: &str = "sector weak";
pub const SECTOR_STEADY: &str = "sector steady";
pub const DEFENSIVE_BID: &str = "defensive bid";
pub const NO_ROTATION: &str = "no rotation";

pub const YIELD_GUIDANCE: &str =
    "Rising yields pressure high-duration equities; favor conservative strikes.";
pub const COMMODITY_GUIDANCE: &str =
    "Safe-haven bid in gold; expect headline risk and consider smaller size or wider spreads.";
pub const VOLATILITY_GUIDANCE: &str =
    "Premiums are rich; PUT credit spreads are attractive if supports hold.";
pub const GROWTH_GUIDANCE: &str =
    "Tech is lagging; covered calls can work on lagging mega-caps (watch catalysts).";
pub const DEFENSIVE_GUIDANCE: &str =
    "Defensives are bid; tighten DTE or reduce exposure into data prints.";
pub const NEUTRAL_GUIDANCE: &str =
    "No stress signals; standard sizing and strike selection apply.";

/// Points considered for a sector's one-period change.
pub const DEFAULT_SECTOR_LOOKBACK: usize = 3;

/// Independently fetched inputs. Any of them may be absent or empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarketInputs<'a> {
    pub ten_year_yield: Option<&'a CanonicalSeries>,
    pub commodity: Option<&'a CanonicalSeries>,
    pub volatility: Option<&'a CanonicalSeries>,
    pub growth_sector: Option<&'a CanonicalSeries>,
    pub defensive_sector: Option<&'a CanonicalSeries>,
}

/// Ordered signals plus guidance text. Guidance is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalReport {
    pub signals: Vec<Signal>,
    pub guidance: String,
}

impl SignalReport {
    pub fn get(&self, indicator: &str) -> Option<&Signal> {
        self.signals.iter().find(|s| s.indicator == indicator)
    }
}

#[derive(Debug, Clone)]
pub struct SignalEngine {
    thresholds: SignalThresholds,
    sector_lookback: usize,
}

impl Default for SignalEngine {
    fn default() -> Self {
        Self::new(SignalThresholds::default())
    }
}

/// Accumulates signals and triggered guidance fragments in evaluation order.
#[derive(Default)]
struct ReportBuilder {
    signals: Vec<Signal>,
    fragments: Vec<&'static str>,
}

impl ReportBuilder {
    fn push(
        &mut self,
        indicator: &str,
        value: String,
        triggered: bool,
        labels: (&str, &str),
        fragment: &'static str,
    ) {
        let label = if triggered { labels.0 } else { labels.1 };
        self.signals.push(Signal::new(indicator, value, label));
        if triggered {
            self.fragments.push(fragment);
        }
    }

    fn finish(self) -> SignalReport {
        let guidance = if self.fragments.is_empty() {
            NEUTRAL_GUIDANCE.to_string()
        } else {
            self.fragments.join(" ")
        };
        SignalReport {
            signals: self.signals,
            guidance,
        }
    }
}

impl SignalEngine {
    pub fn new(thresholds: SignalThresholds) -> Self {
        Self {
            thresholds,
            sector_lookback: DEFAULT_SECTOR_LOOKBACK,
        }
    }

    pub fn with_sector_lookback(mut self, points: usize) -> Self {
        self.sector_lookback = points.max(2);
        self
    }

    pub fn evaluate(&self, inputs: &MarketInputs<'_>) -> SignalReport {
        let t = &self.thresholds;
        let mut report = ReportBuilder::default();

        if let Some(level) = inputs.ten_year_yield.and_then(CanonicalSeries::latest_value) {
            report.push(
                YIELD_INDICATOR,
                format!("{level:.2}%"),
                level >= t.yield_headwind,
                (GROWTH_HEADWIND, RATES_SUPPORTIVE),
                YIELD_GUIDANCE,
            );
        }

        if let Some(change) = inputs.commodity.and_then(CanonicalSeries::pct_change_first_last) {
            report.push(
                COMMODITY_INDICATOR,
                format!("{change:+.2}%"),
                change >= t.commodity_risk_off,
                (RISK_OFF_TONE, CALM),
                COMMODITY_GUIDANCE,
            );
        }

        if let Some(level) = inputs.volatility.and_then(CanonicalSeries::latest_value) {
            report.push(
                VOLATILITY_INDICATOR,
                format!("{level:.2}"),
                level >= t.volatility_rich,
                (PREMIUM_RICH, PREMIUM_THIN),
                VOLATILITY_GUIDANCE,
            );
        }

        if let Some(change) = self.sector_change(inputs.growth_sector) {
            report.push(
                GROWTH_INDICATOR,
                format!("{change:+.2}%"),
                change <= t.growth_weak,
                (SECTOR_WEAK, SECTOR_STEADY),
                GROWTH_GUIDANCE,
            );
        }

        if let Some(change) = self.sector_change(inputs.defensive_sector) {
            report.push(
                DEFENSIVE_INDICATOR,
                format!("{change:+.2}%"),
                change >= t.defensive_bid,
                (DEFENSIVE_BID, NO_ROTATION),
                DEFENSIVE_GUIDANCE,
            );
        }

        report.finish()
    }

    fn sector_change(&self, series: Option<&CanonicalSeries>) -> Option<f64> {
        series.and_then(|s| s.pct_change_last_period(self.sector_lookback))
    }
}
