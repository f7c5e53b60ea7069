//! marketctx core: market context data acquisition, normalization and signals.
//!
//! - Source clients for the headline feed, FRED CSV and Yahoo chart data
//! - Schema normalizer reducing any price-series layout to canonical series
//! - Fallback chain for the 10-year yield (FRED, then the ^TNX proxy)
//! - Process-lifetime TTL cache
//! - Signal engine deriving labels and guidance from partial inputs
//! - Dashboard service assembling the render-boundary snapshot

pub mod config;
pub mod dashboard;
pub mod data;
pub mod signals;

pub use config::{ConfigError, DashboardConfig};
pub use dashboard::{Dashboard, DashboardSnapshot, Section};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types shared across threads are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<data::TtlCache>();
        require_sync::<data::TtlCache>();
        require_send::<data::CanonicalSeries>();
        require_sync::<data::CanonicalSeries>();
        require_send::<data::CanonicalSeriesSet>();
        require_sync::<data::CanonicalSeriesSet>();
        require_send::<data::DataError>();
        require_sync::<data::DataError>();
        require_send::<data::FallbackChain>();
        require_sync::<data::FallbackChain>();

        require_send::<signals::SignalEngine>();
        require_sync::<signals::SignalEngine>();
        require_send::<signals::SignalReport>();
        require_sync::<signals::SignalReport>();

        require_send::<Dashboard>();
        require_sync::<Dashboard>();
        require_send::<DashboardSnapshot>();
        require_sync::<DashboardSnapshot>();
        require_send::<DashboardConfig>();
        require_sync::<DashboardConfig>();
    }
}
