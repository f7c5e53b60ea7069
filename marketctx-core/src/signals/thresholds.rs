//! Classification cutoffs.
//!
//! These are fixed domain heuristics kept configurable; no derivation is
//! implied by the defaults.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalThresholds {
    /// 10Y yield (percent) at or above which rates are a growth headwind.
    pub yield_headwind: f64,
    /// Safe-haven commodity window change (percent) at or above which the tone is risk-off.
    pub commodity_risk_off: f64,
    /// Volatility index level at or above which option premium is rich.
    pub volatility_rich: f64,
    /// Growth sector one-period change (percent) at or below which the sector is weak.
    pub growth_weak: f64,
    /// Defensive sector one-period change (percent) at or above which defensives are bid.
    pub defensive_bid: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            yield_headwind: 4.25,
            commodity_risk_off: 2.0,
            volatility_rich: 20.0,
            growth_weak: -1.0,
            defensive_bid: 0.5,
        }
    }
}

impl SignalThresholds {
    pub fn validate(&self) -> Result<(), String> {
        let all = [
            ("yield_headwind", self.yield_headwind),
            ("commodity_risk_off", self.commodity_risk_off),
            ("volatility_rich", self.volatility_rich),
            ("growth_weak", self.growth_weak),
            ("defensive_bid", self.defensive_bid),
        ];
        match all.iter().find(|(_, v)| !v.is_finite()) {
            Some((name, v)) => Err(format!("threshold {name} must be finite, got {v}")),
            None => Ok(()),
        }
    }
}
