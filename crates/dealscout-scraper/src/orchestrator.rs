//! Concurrent fetch-and-extract over a batch of URLs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Semaphore;

use crate::error::ScraperError;
use crate::extract::{PageExtractor, Record};
use crate::fetch::{host_key, FailureReason, ResilientFetcher};

pub const DEFAULT_MAX_CONCURRENT: usize = 5;
pub const DEFAULT_MAX_PER_HOST: usize = 2;

/// Global and per-host caps on simultaneous fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyLimits {
    pub max_concurrent: usize,
    pub max_per_host: usize,
}

impl Default for ConcurrencyLimits {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            max_per_host: DEFAULT_MAX_PER_HOST,
        }
    }
}

/// What happened to one URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PageOutcome {
    Records {
        total_records: usize,
        records: Vec<Record>,
    },
    Failed {
        error: String,
        #[serde(skip)]
        reason: Option<FailureReason>,
        #[serde(skip)]
        attempts: u32,
    },
}

/// Per-URL result, stamped when the pipeline finished.
///
/// Serialises as `{url, timestamp, total_records, records}` or
/// `{url, timestamp, error}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageExtractionResult {
    pub url: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: PageOutcome,
}

impl PageExtractionResult {
    #[must_use]
    pub fn records(url: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            url: url.into(),
            timestamp: Utc::now(),
            outcome: PageOutcome::Records {
                total_records: records.len(),
                records,
            },
        }
    }

    #[must_use]
    pub fn failed(
        url: impl Into<String>,
        error: impl Into<String>,
        reason: Option<FailureReason>,
        attempts: u32,
    ) -> Self {
        Self {
            url: url.into(),
            timestamp: Utc::now(),
            outcome: PageOutcome::Failed {
                error: error.into(),
                reason,
                attempts,
            },
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, PageOutcome::Records { .. })
    }

    /// Extracted records; empty for failed URLs.
    #[must_use]
    pub fn record_list(&self) -> &[Record] {
        match &self.outcome {
            PageOutcome::Records { records, .. } => records,
            PageOutcome::Failed { .. } => &[],
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            PageOutcome::Records { .. } => None,
            PageOutcome::Failed { error, .. } => Some(error),
        }
    }

    #[must_use]
    pub fn failure_reason(&self) -> Option<FailureReason> {
        match &self.outcome {
            PageOutcome::Records { .. } => None,
            PageOutcome::Failed { reason, .. } => *reason,
        }
    }
}

/// Lazily created semaphore per `host:port`.
#[derive(Debug)]
struct HostLimiter {
    permits: usize,
    semaphores: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl HostLimiter {
    fn new(permits: usize) -> Self {
        Self {
            permits: permits.max(1),
            semaphores: Mutex::new(HashMap::new()),
        }
    }

    fn semaphore(&self, host: &str) -> Arc<Semaphore> {
        let mut table = self
            .semaphores
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            table
                .entry(host.to_owned())
                .or_insert_with(|| Arc::new(Semaphore::new(self.permits))),
        )
    }
}

/// Runs one fetch-then-extract pipeline per URL, concurrently, and returns
/// one result per URL in input order.
///
/// A failing URL never affects the others: fetch exhaustion and even a
/// panicking pipeline become that URL's `Failed` result.
#[derive(Debug, Clone)]
pub struct ExtractionOrchestrator {
    fetcher: Arc<ResilientFetcher>,
    extractor: Arc<PageExtractor>,
    limits: ConcurrencyLimits,
    hosts: Arc<HostLimiter>,
    connections: Arc<Semaphore>,
}

impl ExtractionOrchestrator {
    #[must_use]
    pub fn new(
        fetcher: ResilientFetcher,
        extractor: PageExtractor,
        limits: ConcurrencyLimits,
    ) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            extractor: Arc::new(extractor),
            hosts: Arc::new(HostLimiter::new(limits.max_per_host)),
            connections: Arc::new(Semaphore::new(limits.max_concurrent.max(1))),
            limits,
        }
    }

    #[must_use]
    pub fn limits(&self) -> ConcurrencyLimits {
        self.limits
    }

    /// Processes every URL and returns exactly one result per URL.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::EmptyTargets`] if `urls` is empty. Per-URL
    /// failures are reported inside the results, never as an error.
    pub async fn run(&self, urls: &[String]) -> Result<Vec<PageExtractionResult>, ScraperError> {
        if urls.is_empty() {
            return Err(ScraperError::EmptyTargets);
        }
        tracing::info!(
            urls = urls.len(),
            max_concurrent = self.connections.available_permits(),
            max_per_host = self.hosts.permits,
            "starting extraction run"
        );

        let handles: Vec<_> = urls
            .iter()
            .map(|url| {
                let handle = tokio::spawn(process_url(
                    Arc::clone(&self.fetcher),
                    Arc::clone(&self.extractor),
                    Arc::clone(&self.hosts),
                    Arc::clone(&self.connections),
                    url.clone(),
                ));
                (url.clone(), handle)
            })
            .collect();

        let results: Vec<PageExtractionResult> =
            join_all(handles.into_iter().map(|(url, handle)| async move {
                match handle.await {
                    Ok(result) => result,
                    Err(e) => {
                        tracing::error!(url = %url, error = %e, "URL pipeline aborted");
                        PageExtractionResult::failed(url, format!("pipeline aborted: {e}"), None, 0)
                    }
                }
            }))
            .await;

        let failed = results.iter().filter(|r| !r.is_success()).count();
        if failed > 0 {
            tracing::warn!(failed, total = results.len(), "some URLs failed");
        }
        tracing::info!(total = results.len(), failed, "extraction run complete");
        Ok(results)
    }
}

/// One URL's pipeline.
///
/// The host permit is taken before the global one, so URLs queued behind a
/// busy host never hold a global slot that another host could use. Both are
/// released once the fetch finishes; extraction runs on the blocking pool.
async fn process_url(
    fetcher: Arc<ResilientFetcher>,
    extractor: Arc<PageExtractor>,
    hosts: Arc<HostLimiter>,
    connections: Arc<Semaphore>,
    url: String,
) -> PageExtractionResult {
    let semaphore = hosts.semaphore(&host_key(&url));
    let fetched = {
        // Neither semaphore is ever closed.
        let _host = semaphore.acquire_owned().await.ok();
        let _slot = connections.acquire().await.ok();
        fetcher.fetch(&url).await
    };

    if !fetched.succeeded || fetched.html.is_none() {
        let error = fetched
            .failure_message()
            .unwrap_or_else(|| "fetch failed".to_owned());
        return PageExtractionResult::failed(url, error, fetched.failure_reason, fetched.attempts);
    }

    let html = fetched.html.unwrap_or_default();
    let page_url = url.clone();
    let extracted =
        tokio::task::spawn_blocking(move || extractor.extract(&html, Some(&page_url))).await;
    match extracted {
        Ok(extraction) => {
            if extraction.records.is_empty() {
                tracing::warn!(url = %url, "page fetched but no records extracted");
            }
            PageExtractionResult::records(url, extraction.records)
        }
        Err(e) => {
            tracing::error!(url = %url, error = %e, "extraction aborted");
            let error = format!("extraction aborted: {e}");
            PageExtractionResult::failed(url, error, None, fetched.attempts)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{Field, FieldValue};

    fn ts(result: PageExtractionResult) -> PageExtractionResult {
        PageExtractionResult {
            timestamp: DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
                .unwrap()
                .with_timezone(&Utc),
            ..result
        }
    }

    #[test]
    fn records_result_serialises_flat() {
        let mut record = Record::default();
        record.insert(Field::Title, FieldValue::Text("Echo Dot".to_owned()));
        let result = ts(PageExtractionResult::records("https://shop.test/deals", vec![record]));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "url": "https://shop.test/deals",
                "timestamp": "2026-01-02T03:04:05Z",
                "total_records": 1,
                "records": [{"title": "Echo Dot"}],
            })
        );
    }

    #[test]
    fn failed_result_serialises_error_only() {
        let result = ts(PageExtractionResult::failed(
            "https://shop.test/deals",
            "blocked (HTTP 503) after 3 attempts",
            Some(FailureReason::Blocked),
            3,
        ));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "url": "https://shop.test/deals",
                "timestamp": "2026-01-02T03:04:05Z",
                "error": "blocked (HTTP 503) after 3 attempts",
            })
        );
        assert_eq!(result.failure_reason(), Some(FailureReason::Blocked));
        assert!(result.record_list().is_empty());
    }

    #[test]
    fn host_limiter_reuses_semaphore_per_host() {
        let hosts = HostLimiter::new(2);
        let a = hosts.semaphore("shop.test:443");
        let b = hosts.semaphore("shop.test:443");
        let c = hosts.semaphore("other.test:443");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(a.available_permits(), 2);
    }

    #[test]
    fn host_limiter_never_has_zero_permits() {
        let hosts = HostLimiter::new(0);
        assert_eq!(hosts.semaphore("shop.test:443").available_permits(), 1);
    }
}
