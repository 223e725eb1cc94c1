//! Browser-like request identities for storefront fetches.
//!
//! An [`Identity`] is the simulated client fingerprint used for one fetch
//! attempt: a user agent drawn from a fixed desktop pool plus a fixed set of
//! baseline browser headers. [`AttemptStrategy`] varies the identity across
//! retry attempts so a block on one fingerprint does not doom the next.
//!
//! All randomness flows through an injectable RNG. Production code uses
//! [`RequestIdentityProvider::from_entropy`]; tests seed it for repeatable
//! draws.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::ScraperError;

/// Desktop user agents rotated across requests.
pub const DESKTOP_USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/119.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// User agent forced on the last-resort attempt.
pub const MOBILE_USER_AGENT: &str =
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1.2 Mobile/15E148 Safari/604.1";

/// Fingerprint headers a desktop Chrome sends on a top-level navigation.
///
/// `Accept-Encoding` is deliberately absent: the HTTP client advertises the
/// encodings it can decode itself.
const BASELINE_HEADERS: [(&str, &str); 11] = [
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7",
    ),
    ("accept-language", "en-US,en;q=0.9,en;q=0.8"),
    ("upgrade-insecure-requests", "1"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
    ("cache-control", "max-age=0"),
    ("dnt", "1"),
    (
        "sec-ch-ua",
        r#""Not_A Brand";v="8", "Chromium";v="120", "Google Chrome";v="120""#,
    ),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", r#""Windows""#),
];

/// The simulated client fingerprint for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_agent: String,
    /// Lower-case header name to value. Never contains `user-agent`.
    pub headers: BTreeMap<String, String>,
}

impl Identity {
    /// Looks up a header value by (case-insensitive) name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Converts the identity into a header map, user agent included.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidHeader`] if a name or value is not a
    /// legal HTTP header token.
    pub fn to_header_map(&self) -> Result<HeaderMap, ScraperError> {
        let mut map = HeaderMap::with_capacity(self.headers.len() + 1);
        let pairs = self
            .headers
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(std::iter::once(("user-agent", self.user_agent.as_str())));

        for (name, value) in pairs {
            let header_name =
                HeaderName::try_from(name).map_err(|e| ScraperError::InvalidHeader {
                    name: name.to_owned(),
                    reason: e.to_string(),
                })?;
            let header_value =
                HeaderValue::try_from(value).map_err(|e| ScraperError::InvalidHeader {
                    name: name.to_owned(),
                    reason: e.to_string(),
                })?;
            map.insert(header_name, header_value);
        }

        Ok(map)
    }
}

/// How a given fetch attempt disguises itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStrategy {
    /// Random desktop identity, no referer.
    Baseline,
    /// Desktop identity plus `Referer`/`Origin` pointing at the site root,
    /// mimicking organic navigation from the homepage.
    RefererOrigin,
    /// Baseline headers with a mobile Safari user agent.
    MobileAgent,
}

impl AttemptStrategy {
    /// Strategy for the zero-based `attempt` index.
    #[must_use]
    pub fn for_attempt(attempt: u32) -> Self {
        match attempt {
            0 => Self::Baseline,
            1 => Self::RefererOrigin,
            _ => Self::MobileAgent,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::RefererOrigin => "referer-origin",
            Self::MobileAgent => "mobile-agent",
        }
    }
}

impl std::fmt::Display for AttemptStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Random desktop user agent merged with the baseline headers.
pub fn random_identity<R: Rng + ?Sized>(rng: &mut R) -> Identity {
    let user_agent = DESKTOP_USER_AGENTS
        .choose(rng)
        .copied()
        .unwrap_or(DESKTOP_USER_AGENTS[0])
        .to_owned();

    let headers = BASELINE_HEADERS
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();

    Identity {
        user_agent,
        headers,
    }
}

/// Builds the identity for one attempt.
///
/// `origin` is the scheme+host of the target (e.g. `https://www.amazon.in`).
/// When it is `None` the referer strategy degrades to the baseline identity.
pub fn identity_for_attempt<R: Rng + ?Sized>(
    strategy: AttemptStrategy,
    rng: &mut R,
    origin: Option<&str>,
) -> Identity {
    let mut identity = random_identity(rng);
    match strategy {
        AttemptStrategy::Baseline => {}
        AttemptStrategy::RefererOrigin => {
            if let Some(origin) = origin {
                identity
                    .headers
                    .insert("referer".to_owned(), format!("{origin}/"));
                identity
                    .headers
                    .insert("origin".to_owned(), origin.to_owned());
            }
        }
        AttemptStrategy::MobileAgent => {
            MOBILE_USER_AGENT.clone_into(&mut identity.user_agent);
        }
    }
    identity
}

/// Thread-safe owner of the RNG used for identity rotation and backoff jitter.
#[derive(Debug)]
pub struct RequestIdentityProvider {
    rng: Mutex<StdRng>,
}

impl RequestIdentityProvider {
    /// Provider seeded from operating-system entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic provider for tests.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Next random baseline identity.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> Identity {
        self.with_rng(|rng| random_identity(rng))
    }

    /// Identity for the given strategy against `origin`.
    pub fn for_attempt(&self, strategy: AttemptStrategy, origin: Option<&str>) -> Identity {
        self.with_rng(|rng| identity_for_attempt(strategy, rng, origin))
    }

    /// Runs `f` with exclusive access to the RNG. The lock is never held
    /// across an await point.
    pub(crate) fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut guard = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *guard)
    }
}

impl Default for RequestIdentityProvider {
    fn default() -> Self {
        Self::from_entropy()
    }
}
