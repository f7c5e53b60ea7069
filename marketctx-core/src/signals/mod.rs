//! Interpretive signals derived from canonical series.
//!
//! Each indicator with data yields exactly one `Signal`; indicators without
//! data are omitted, so a report carries between zero and five signals.
//! Nothing here fails on missing input.

pub mod change;
pub mod engine;
pub mod thresholds;

pub use change::{pct_change_first_last, pct_change_last_period};
pub use engine::{MarketInputs, SignalEngine, SignalReport};
pub use thresholds::SignalThresholds;

use serde::{Deserialize, Serialize};

/// Threshold-derived label attached to one indicator's latest/recent value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub indicator: String,
    /// Value formatted for display (e.g. `4.31%`, `22.50`, `+2.35%`).
    pub value: String,
    pub label: String,
}

impl Signal {
    pub fn new(
        indicator: impl Into<String>,
        value: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            indicator: indicator.into(),
            value: value.into(),
            label: label.into(),
        }
    }
}
