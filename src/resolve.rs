//! Per-request intensity resolution.
//!
//! Decides which theme applies to a request: an explicit cookie override
//! wins, a disable cookie suppresses rewriting entirely, and otherwise the
//! visitor's country is resolved against cached or freshly fetched carbon
//! data. Every failure on this path is a typed error the dispatcher turns
//! into "serve the origin unmodified".

use std::sync::Arc;
use std::time::Duration;

use cookie::Cookie;
use tracing::{debug, warn};

use crate::carbon::{CarbonCache, CarbonDataProvider, CarbonReading};
use crate::error::{GridError, Result};
use crate::theme::Intensity;

/// Cookie holding the user's switcher choice.
pub const OVERRIDE_COOKIE: &str = "selected-intensity";

/// Cookie disabling grid-aware rewriting altogether.
pub const DISABLE_COOKIE: &str = "grid-aware";

/// Value of [`DISABLE_COOKIE`] that disables rewriting.
pub const DISABLE_VALUE: &str = "off";

/// Where a decision came from, echoed in logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    Override,
    Cache,
    Fresh,
    Unknown,
}

/// The per-request outcome of intensity resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteDecision {
    pub intensity: Intensity,
    pub source: DecisionSource,
    /// Label echoed into the page chrome.
    pub label: &'static str,
}

impl RewriteDecision {
    fn overridden(intensity: Intensity) -> Self {
        Self {
            intensity,
            source: DecisionSource::Override,
            label: intensity.label(),
        }
    }

    fn computed(reading: &CarbonReading, source: DecisionSource) -> Self {
        let intensity = Intensity::from_low_carbon_percentage(reading.low_carbon_percentage);
        // A reading that maps to no band (only possible via older cache
        // entries; fresh payloads are validated) keeps the page unthemed
        // but still gets the switcher chrome.
        let source = if intensity == Intensity::Unknown {
            DecisionSource::Unknown
        } else {
            source
        };
        Self {
            intensity,
            source,
            label: intensity.label(),
        }
    }
}

/// Resolution outcome: rewrite with a decision, or leave the response alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Rewrite(RewriteDecision),
    /// The visitor opted out; terminal, the dispatcher bypasses.
    Disabled,
}

/// Rewrite-relevant signals parsed from the `Cookie` header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CookieSignals {
    /// A recognized override value, if any. `live` is not an override.
    pub override_intensity: Option<Intensity>,
    /// The disable cookie was present.
    pub disabled: bool,
}

impl CookieSignals {
    /// Parse a raw `Cookie` header value. Unparseable pairs are skipped.
    #[must_use]
    pub fn from_header(header: Option<&str>) -> Self {
        let mut signals = Self::default();
        let Some(header) = header else {
            return signals;
        };

        for cookie in Cookie::split_parse(header).flatten() {
            match cookie.name() {
                OVERRIDE_COOKIE => {
                    signals.override_intensity = Intensity::from_override(cookie.value());
                }
                DISABLE_COOKIE if cookie.value() == DISABLE_VALUE => {
                    signals.disabled = true;
                }
                _ => {}
            }
        }
        signals
    }
}

/// Resolves a theme decision for each request.
#[derive(Clone)]
pub struct IntensityResolver {
    provider: Arc<dyn CarbonDataProvider>,
    cache: CarbonCache,
    provider_timeout: Duration,
}

impl IntensityResolver {
    #[must_use]
    pub fn new(
        provider: Arc<dyn CarbonDataProvider>,
        cache: CarbonCache,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            cache,
            provider_timeout,
        }
    }

    /// Resolve a decision from request signals.
    ///
    /// Precedence: override cookie, disable cookie, then carbon data for
    /// the visitor's country (cache first, provider on miss). Provider
    /// errors and timeouts are never cached.
    pub async fn resolve(
        &self,
        cookies: CookieSignals,
        country: Option<&str>,
    ) -> Result<Resolution> {
        if let Some(intensity) = cookies.override_intensity {
            debug!(intensity = intensity.label(), "Override cookie set");
            return Ok(Resolution::Rewrite(RewriteDecision::overridden(intensity)));
        }

        if cookies.disabled {
            debug!("Disable cookie set");
            return Ok(Resolution::Disabled);
        }

        let country = country.ok_or(GridError::LocationUnresolvable)?;

        if let Some(reading) = self.cache.get(country).await {
            return Ok(Resolution::Rewrite(RewriteDecision::computed(
                &reading,
                DecisionSource::Cache,
            )));
        }

        let reading = tokio::time::timeout(self.provider_timeout, self.provider.latest(country))
            .await
            .map_err(|_| GridError::ProviderTimeout {
                country: country.to_string(),
                timeout_ms: u64::try_from(self.provider_timeout.as_millis()).unwrap_or(u64::MAX),
            })??;

        if let Err(e) = self.cache.put(&reading).await {
            // A reading we could not cache still themes this response.
            warn!(country, error = %e, kind = e.kind(), "Failed to cache reading");
        }

        Ok(Resolution::Rewrite(RewriteDecision::computed(
            &reading,
            DecisionSource::Fresh,
        )))
    }
}
