//! External carbon-intensity data provider client.
//!
//! Fetches the latest power-breakdown figures for a country and converts
//! them into a [`CarbonReading`]. The provider is a trait so the resolver
//! can be exercised against canned data in tests.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::CarbonReading;
use crate::error::{GridError, Result};

/// Which percentage of the provider payload counts as "low carbon".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataMode {
    /// Fossil-free share: renewables plus nuclear.
    #[default]
    LowCarbon,
    /// Renewables only.
    Renewable,
}

impl DataMode {
    /// Parse the configuration string form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low-carbon" => Some(Self::LowCarbon),
            "renewable" => Some(Self::Renewable),
            _ => None,
        }
    }
}

/// Source of carbon readings, keyed by country code.
#[async_trait]
pub trait CarbonDataProvider: Send + Sync {
    /// Fetch the latest reading for a country.
    async fn latest(&self, country: &str) -> Result<CarbonReading>;
}

/// Latest power-breakdown payload from the data provider.
#[derive(Debug, Deserialize)]
struct PowerBreakdown {
    #[serde(rename = "fossilFreePercentage")]
    fossil_free_percentage: Option<f64>,
    #[serde(rename = "renewablePercentage")]
    renewable_percentage: Option<f64>,
}

/// HTTP client for the carbon-data API.
#[derive(Debug, Clone)]
pub struct HttpCarbonProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    mode: DataMode,
}

impl HttpCarbonProvider {
    /// Build a provider client with connection pooling and a request timeout.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        mode: DataMode,
        timeout_ms: u64,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("gridshift/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(4)
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| GridError::Other(format!("failed to build provider HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            mode,
        })
    }
}

#[async_trait]
impl CarbonDataProvider for HttpCarbonProvider {
    async fn latest(&self, country: &str) -> Result<CarbonReading> {
        let url = format!("{}/power-breakdown/latest", self.base_url);

        debug!(country, url = %url, "Fetching carbon data");

        let resp = self
            .client
            .get(&url)
            .query(&[("countryCode", country)])
            .header("auth-token", &self.api_key)
            .send()
            .await
            .map_err(|e| GridError::Provider {
                country: country.to_string(),
                reason: format!("HTTP error: {e}"),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GridError::Provider {
                country: country.to_string(),
                reason: format!("provider returned {}: {}", status, &body[..body.len().min(200)]),
            });
        }

        let payload: PowerBreakdown = resp.json().await.map_err(|e| GridError::Provider {
            country: country.to_string(),
            reason: format!("JSON parse error: {e}"),
        })?;

        let percentage = match self.mode {
            DataMode::LowCarbon => payload.fossil_free_percentage,
            DataMode::Renewable => payload.renewable_percentage,
        }
        .ok_or_else(|| GridError::Provider {
            country: country.to_string(),
            reason: "payload missing percentage field".to_string(),
        })?;

        if !(0.0..=100.0).contains(&percentage) {
            return Err(GridError::Provider {
                country: country.to_string(),
                reason: format!("percentage out of range: {percentage}"),
            });
        }

        debug!(country, percentage, "Carbon data fetched");

        Ok(CarbonReading::new(country, percentage))
    }
}
