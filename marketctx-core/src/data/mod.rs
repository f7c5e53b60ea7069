//! Data acquisition, normalization and caching.

pub mod cache;
pub mod fallback;
pub mod fred;
pub mod news;
pub mod normalize;
pub mod provider;
pub mod series;
pub mod transport;
pub mod yahoo;

pub use cache::{Clock, ManualClock, SystemClock, TtlCache};
pub use fallback::{FallbackChain, IndicatorSource, ProxySeriesSource, SourcedSeries};
pub use fred::FredCsvSource;
pub use news::{NewsItem, RssFeed};
pub use normalize::{normalize_close, ColumnKey, Normalizer, RawTable, TableShape};
pub use provider::{
    DataError, DataSource, HttpTransport, Interval, Period, PriceSource, SourceAttempt,
};
pub use series::{CanonicalSeries, CanonicalSeriesSet};
pub use transport::ReqwestTransport;
pub use yahoo::YahooPriceSource;
