//! Process-lifetime TTL cache for fetch-and-normalize operations.
//!
//! Entries are keyed by operation name plus a BLAKE3 hash of the serialized
//! arguments, so two calls with identical arguments share one entry.
//!
//! - Hits within the TTL return the same `Arc` without recomputing
//! - Expired entries are recomputed in full and overwritten
//! - Failed computations are never stored; the next call retries
//!
//! The lock is not held while computing, so two concurrent misses on the same
//! key both hit upstream. The dashboard renders one pass at a time.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::provider::DataError;

/// Source of "now" for TTL checks and trailing windows.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for tests and replays.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        if let Ok(delta) = chrono::Duration::from_std(by) {
            *now += delta;
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cache key: operation identity plus content hash of its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    operation: String,
    args_hash: String,
}

impl CacheKey {
    pub fn new<A: Serialize + ?Sized>(operation: &str, args: &A) -> Result<Self, DataError> {
        let json = serde_json::to_vec(args)
            .map_err(|e| DataError::Cache(format!("key serialization for {operation}: {e}")))?;
        Ok(Self {
            operation: operation.to_string(),
            args_hash: blake3::hash(&json).to_hex().to_string(),
        })
    }
}

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    created_at: DateTime<Utc>,
    ttl: Duration,
}

impl CacheEntry {
    /// A clock that moved backwards past `created_at` counts as expired.
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        (now - self.created_at)
            .to_std()
            .map(|elapsed| elapsed < self.ttl)
            .unwrap_or(false)
    }
}

/// TTL cache shared by every fetch operation of one process.
pub struct TtlCache {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TtlCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Return the cached value for `(operation, args)` if still fresh,
    /// otherwise run `compute` and store its success.
    pub fn get_or_try_compute<T, A, F>(
        &self,
        operation: &str,
        args: &A,
        ttl: Duration,
        compute: F,
    ) -> Result<Arc<T>, DataError>
    where
        T: Any + Send + Sync,
        A: Serialize + ?Sized,
        F: FnOnce() -> Result<T, DataError>,
    {
        let key = CacheKey::new(operation, args)?;

        if let Some(hit) = self.lookup::<T>(&key) {
            debug!(operation, "cache hit");
            return Ok(hit);
        }

        debug!(operation, "cache miss");
        let value = Arc::new(compute()?);
        let entry = CacheEntry {
            value: value.clone(),
            created_at: self.clock.now(),
            ttl,
        };
        self.lock().insert(key, entry);
        Ok(value)
    }

    fn lookup<T: Any + Send + Sync>(&self, key: &CacheKey) -> Option<Arc<T>> {
        let now = self.clock.now();
        let mut entries = self.lock();

        let fresh = entries.get(key).map(|e| e.is_fresh(now))?;
        if !fresh {
            entries.remove(key);
            return None;
        }

        // Same operation name reused with a different value type: treat as a miss.
        entries
            .get(key)
            .and_then(|e| Arc::clone(&e.value).downcast::<T>().ok())
    }

    /// Number of stored entries, fresh or not.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Remove expired entries. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, e| e.is_fresh(now));
        before - entries.len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
