//! Country-keyed, TTL-bounded cache of carbon readings.
//!
//! The backing store is an opaque key/value collaborator behind the
//! [`KvStore`] trait; values are serialized as text and deserialized on
//! read, exactly once each way. Concurrent writers for the same key may
//! race; last-write-wins is acceptable because readings are idempotent
//! approximations of a slowly-changing signal.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, warn};

use super::CarbonReading;
use crate::error::{GridError, Result};

/// Default time-to-live for cached readings.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Opaque key/value store with per-entry TTL.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value; absent and expired entries both return None.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value with a TTL, replacing any existing entry wholesale.
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<()>;
}

/// Shared handle to a store implementation.
pub type SharedKvStore = Arc<dyn KvStore>;

/// In-process store over a concurrent map with lazy expiry.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: DashMap<String, StoredValue>,
}

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Instant,
}

impl MemoryKvStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let Some(entry) = self.entries.get(key) else {
            return Ok(None);
        };
        if entry.expires_at <= Instant::now() {
            drop(entry);
            self.entries.remove(key);
            return Ok(None);
        }
        Ok(Some(entry.value.clone()))
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.entries.insert(
            key.to_string(),
            StoredValue {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}

/// Cache of [`CarbonReading`]s over an opaque store.
#[derive(Clone)]
pub struct CarbonCache {
    store: SharedKvStore,
    ttl: Duration,
}

impl CarbonCache {
    /// Wrap a store with the given TTL for new entries.
    #[must_use]
    pub fn new(store: SharedKvStore, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Look up the cached reading for a country.
    ///
    /// Store failures and undecodable entries are logged and reported as a
    /// miss; this path never surfaces an error to the caller.
    pub async fn get(&self, country: &str) -> Option<CarbonReading> {
        let raw = match self.store.get(country).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(country, error = %e, kind = e.kind(), "Cache read failed, treating as miss");
                return None;
            }
        };

        match parse_reading(&raw) {
            Ok(reading) => {
                debug!(country, percentage = reading.low_carbon_percentage, "Cache hit");
                Some(reading)
            }
            Err(e) => {
                let e = GridError::CacheDeserialization {
                    country: country.to_string(),
                    reason: e.to_string(),
                };
                warn!(country, error = %e, kind = e.kind(), "Corrupt cache entry, treating as miss");
                None
            }
        }
    }

    /// Store a fresh reading, replacing any existing entry.
    pub async fn put(&self, reading: &CarbonReading) -> Result<()> {
        let value = serde_json::to_string(reading)
            .map_err(|e| GridError::CacheStore(format!("serialize failed: {e}")))?;
        self.store.put(&reading.country_code, value, self.ttl).await
    }
}

/// Deserialize a cached reading, exactly once.
///
/// Compatibility fallback: entries written by an earlier deployment were
/// JSON-encoded twice (the serialized reading stored as a JSON string).
/// If the direct parse fails, one re-parse of the string form is attempted
/// before the entry is declared corrupt.
fn parse_reading(raw: &str) -> serde_json::Result<CarbonReading> {
    match serde_json::from_str::<CarbonReading>(raw) {
        Ok(reading) => Ok(reading),
        Err(first_err) => match serde_json::from_str::<String>(raw) {
            Ok(inner) => serde_json::from_str::<CarbonReading>(&inner),
            Err(_) => Err(first_err),
        },
    }
}
