//! Carbon-intensity data: model, provider client, and cache.
//!
//! A [`CarbonReading`] is produced by the external data provider, cached
//! per country with a TTL, and mapped onto a theme by the resolver.

pub mod cache;
pub mod provider;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use cache::{CarbonCache, KvStore, MemoryKvStore};
pub use provider::{CarbonDataProvider, DataMode, HttpCarbonProvider};

/// A snapshot of grid carbon data for one country.
///
/// Immutable once created; a stale cache entry is replaced wholesale by a
/// fresh fetch, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarbonReading {
    /// ISO 3166-1 alpha-2 country code the reading applies to.
    pub country_code: String,
    /// Share of generation from low-carbon sources, 0-100.
    pub low_carbon_percentage: f64,
    /// When the reading was fetched from the provider.
    pub fetched_at: DateTime<Utc>,
}

impl CarbonReading {
    /// Create a reading stamped with the current time.
    #[must_use]
    pub fn new(country_code: impl Into<String>, low_carbon_percentage: f64) -> Self {
        Self {
            country_code: country_code.into(),
            low_carbon_percentage,
            fetched_at: Utc::now(),
        }
    }
}
