//! Adaptive fetch-with-retry for storefront pages.
//!
//! [`ResilientFetcher`] walks a small state machine over attempts. Each
//! attempt disguises itself differently (see [`AttemptStrategy`]) and is
//! separated from the previous one by a jittered backoff. Every outcome,
//! including exhaustion, is reported as a [`FetchResult`] value; `fetch`
//! never fails.

mod backoff;
mod origin;
mod outcome;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::error::ScraperError;
use crate::identity::{AttemptStrategy, Identity, RequestIdentityProvider};

pub use backoff::{backoff_delay, BackoffPolicy};
pub use origin::{extract_host, extract_origin, host_key};
pub use outcome::{FailureReason, FetchResult};

use outcome::{classify_status, classify_transport};

/// Default number of attempts per URL.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Transport and retry settings for a [`ResilientFetcher`].
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Total budget for one attempt, body included.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub max_attempts: u32,
    pub backoff: BackoffPolicy,
    /// Idle keep-alive connections retained per host.
    pub max_idle_per_host: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(20),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: BackoffPolicy::default(),
            max_idle_per_host: 2,
        }
    }
}

/// Why a single attempt did not produce a body.
#[derive(Debug, Clone, Copy)]
struct AttemptFailure {
    reason: FailureReason,
    status: Option<u16>,
}

/// HTTP GET with identity rotation and randomized backoff.
///
/// One instance is shared by every URL pipeline of a run: the underlying
/// `reqwest::Client` pools connections and keeps a run-scoped cookie store.
#[derive(Debug)]
pub struct ResilientFetcher {
    client: Client,
    identities: Arc<RequestIdentityProvider>,
    max_attempts: u32,
    backoff: BackoffPolicy,
}

impl ResilientFetcher {
    /// Creates a fetcher with an entropy-seeded identity provider.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(config: &FetcherConfig) -> Result<Self, ScraperError> {
        Self::with_identity_provider(config, Arc::new(RequestIdentityProvider::from_entropy()))
    }

    /// Creates a fetcher drawing identities and backoff jitter from
    /// `identities`. Pass a seeded provider for deterministic runs.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn with_identity_provider(
        config: &FetcherConfig,
        identities: Arc<RequestIdentityProvider>,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.max_idle_per_host)
            .cookie_store(true)
            .build()?;
        Ok(Self {
            client,
            identities,
            max_attempts: config.max_attempts.max(1),
            backoff: config.backoff,
        })
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Fetches `url` using the configured attempt budget.
    pub async fn fetch(&self, url: &str) -> FetchResult {
        self.fetch_with_attempts(url, self.max_attempts).await
    }

    /// Fetches `url` with up to `max_attempts` requests (at least one).
    ///
    /// Attempt 0 uses a baseline identity, attempt 1 adds a same-site
    /// `Referer`/`Origin`, later attempts force a mobile user agent. HTTP 200
    /// returns immediately; 503, other statuses, timeouts and transport
    /// faults are all retried until the budget runs out, at which point the
    /// last classification is reported.
    pub async fn fetch_with_attempts(&self, url: &str, max_attempts: u32) -> FetchResult {
        let max_attempts = max_attempts.max(1);
        let origin = extract_origin(url);
        let mut last = AttemptFailure {
            reason: FailureReason::TransportError,
            status: None,
        };
        let mut last_status = None;

        for attempt in 0..max_attempts {
            if attempt > 0 {
                let delay = self
                    .identities
                    .with_rng(|rng| backoff_delay(rng, &self.backoff));
                tracing::debug!(
                    url,
                    attempt = attempt + 1,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "backing off before retry"
                );
                tokio::time::sleep(delay).await;
            }

            let strategy = AttemptStrategy::for_attempt(attempt);
            let identity = self.identities.for_attempt(strategy, origin.as_deref());
            tracing::info!(
                url,
                attempt = attempt + 1,
                max_attempts,
                strategy = %strategy,
                "fetching page"
            );

            match self.attempt(url, &identity).await {
                Ok(body) => {
                    tracing::info!(
                        url,
                        attempt = attempt + 1,
                        bytes = body.len(),
                        "fetched page"
                    );
                    return FetchResult::success(url, body, attempt + 1);
                }
                Err(failure) => {
                    tracing::warn!(
                        url,
                        attempt = attempt + 1,
                        max_attempts,
                        strategy = %strategy,
                        reason = %failure.reason,
                        status = failure.status,
                        "fetch attempt failed"
                    );
                    if failure.status.is_some() {
                        last_status = failure.status;
                    }
                    last = failure;
                }
            }
        }

        tracing::warn!(url, max_attempts, reason = %last.reason, "all fetch attempts failed");
        FetchResult::failure(url, last.reason, max_attempts, last_status)
    }

    /// Sends one request and reads the body. The client-level timeout bounds
    /// the whole exchange, so expiry cancels only this attempt.
    async fn attempt(&self, url: &str, identity: &Identity) -> Result<String, AttemptFailure> {
        let headers = identity.to_header_map().map_err(|e| {
            tracing::error!(url, error = %e, "could not build request headers");
            AttemptFailure {
                reason: FailureReason::TransportError,
                status: None,
            }
        })?;

        let response = self
            .client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| {
                tracing::debug!(url, error = %e, "request failed");
                AttemptFailure {
                    reason: classify_transport(&e),
                    status: None,
                }
            })?;

        let status = response.status();
        if let Some(reason) = classify_status(status) {
            return Err(AttemptFailure {
                reason,
                status: Some(status.as_u16()),
            });
        }

        response.text().await.map_err(|e| {
            tracing::debug!(url, error = %e, "reading response body failed");
            AttemptFailure {
                reason: classify_transport(&e),
                status: Some(status.as_u16()),
            }
        })
    }
}
