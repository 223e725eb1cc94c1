//! `scrape` and `targets` command handlers.
//!
//! Per-URL failures are reported in the summary and the output file rather
//! than aborting the run; only a run where every URL failed exits non-zero.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use dealscout_core::targets::normalize_urls;
use dealscout_core::{load_targets, AppConfig};
use dealscout_scraper::extract::{ExtractionLimits, FallbackScan};
use dealscout_scraper::{
    BackoffPolicy, ConcurrencyLimits, ExtractionOrchestrator, FetcherConfig, PageExtractionResult,
    PageExtractor, ResilientFetcher,
};

use crate::output;

#[derive(Debug, Default)]
pub(crate) struct ScrapeOptions {
    pub urls: Vec<String>,
    pub targets_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub split_by_domain: bool,
    pub max_attempts: Option<u32>,
}

/// URLs to scrape: the positional ones if any were given, else the targets
/// file.
pub(crate) fn resolve_urls(urls: Vec<String>, targets_path: &Path) -> anyhow::Result<Vec<String>> {
    if !urls.is_empty() {
        return Ok(normalize_urls(urls)?);
    }
    let targets = load_targets(targets_path)
        .with_context(|| format!("failed to load targets from {}", targets_path.display()))?;
    Ok(targets.urls())
}

pub(crate) fn fetcher_config(config: &AppConfig, max_attempts: Option<u32>) -> FetcherConfig {
    FetcherConfig {
        request_timeout: Duration::from_secs(config.request_timeout_secs),
        connect_timeout: Duration::from_secs(config.connect_timeout_secs),
        max_attempts: max_attempts.unwrap_or(config.max_attempts).max(1),
        backoff: BackoffPolicy::new(
            Duration::from_millis(config.backoff_min_ms),
            Duration::from_millis(config.backoff_max_ms),
        ),
        max_idle_per_host: config.max_per_host,
    }
}

pub(crate) fn build_orchestrator(
    config: &AppConfig,
    max_attempts: Option<u32>,
) -> anyhow::Result<ExtractionOrchestrator> {
    let fetcher = ResilientFetcher::new(&fetcher_config(config, max_attempts))
        .context("failed to build HTTP client")?;
    let extractor = PageExtractor::new()
        .with_limits(ExtractionLimits {
            max_records: config.max_records_per_page,
            ..ExtractionLimits::default()
        })
        .with_fallback(FallbackScan {
            scan_limit: config.fallback_scan_limit,
            ..FallbackScan::default()
        });
    let limits = ConcurrencyLimits {
        max_concurrent: config.max_concurrent,
        max_per_host: config.max_per_host,
    };
    Ok(ExtractionOrchestrator::new(fetcher, extractor, limits))
}

/// Scrapes every URL, saves the results, and prints a per-URL summary.
///
/// # Errors
///
/// Returns an error if no URLs resolve, the HTTP client cannot be built,
/// results cannot be written, or every URL failed.
pub(crate) async fn run_scrape(config: &AppConfig, options: ScrapeOptions) -> anyhow::Result<()> {
    let targets_path = options
        .targets_path
        .unwrap_or_else(|| config.targets_path.clone());
    let output_dir = options
        .output_dir
        .unwrap_or_else(|| config.output_dir.clone());

    let urls = resolve_urls(options.urls, &targets_path)?;
    tracing::info!(urls = urls.len(), "resolved scrape targets");

    let orchestrator = build_orchestrator(config, options.max_attempts)?;
    let results = orchestrator.run(&urls).await?;

    let stamp = output::timestamp_slug(chrono::Local::now());
    let written = output::save_results(&results, &output_dir, options.split_by_domain, &stamp)
        .with_context(|| format!("failed to save results under {}", output_dir.display()))?;

    print_summary(&results);
    for path in &written {
        println!("saved {}", path.display());
    }

    let failed = results.iter().filter(|r| !r.is_success()).count();
    if failed == results.len() {
        anyhow::bail!("all {failed} URLs failed");
    }
    Ok(())
}

fn print_summary(results: &[PageExtractionResult]) {
    let total_records: usize = results.iter().map(|r| r.record_list().len()).sum();
    for result in results {
        match result.error() {
            None => println!("{}: {} records", result.url, result.record_list().len()),
            Some(error) => println!("{}: FAILED ({error})", result.url),
        }
    }
    println!("{} URLs, {total_records} records", results.len());
}

/// Loads, validates and prints the targets file.
///
/// # Errors
///
/// Returns an error if the targets file is missing, malformed or invalid.
pub(crate) fn run_list_targets(config: &AppConfig, targets: Option<&Path>) -> anyhow::Result<()> {
    let path = targets.unwrap_or(config.targets_path.as_path());
    let file = load_targets(path)
        .with_context(|| format!("failed to load targets from {}", path.display()))?;
    println!("{} targets in {}", file.targets.len(), path.display());
    for target in &file.targets {
        println!("  {:<16} {}", target.display_name(), target.url);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            log_level: "info".to_string(),
            targets_path: PathBuf::from("./config/targets.yaml"),
            output_dir: PathBuf::from("./output"),
            request_timeout_secs: 30,
            connect_timeout_secs: 20,
            max_attempts: 3,
            backoff_min_ms: 2000,
            backoff_max_ms: 5000,
            max_concurrent: 5,
            max_per_host: 2,
            max_records_per_page: 20,
            fallback_scan_limit: 50,
        }
    }

    #[test]
    fn positional_urls_override_targets_file() {
        let urls = vec!["https://shop.test/deals".to_string()];
        let resolved = resolve_urls(urls.clone(), Path::new("/nonexistent/targets.yaml")).unwrap();
        assert_eq!(resolved, urls);
    }

    #[test]
    fn positional_urls_are_trimmed() {
        let resolved = resolve_urls(
            vec![" https://shop.test/deals ".to_string()],
            Path::new("/nonexistent/targets.yaml"),
        )
        .unwrap();
        assert_eq!(resolved, vec!["https://shop.test/deals"]);
    }

    #[test]
    fn invalid_positional_url_is_rejected_before_running() {
        let result = resolve_urls(
            vec!["notaurl".to_string()],
            Path::new("/nonexistent/targets.yaml"),
        );
        assert!(result.is_err(), "expected error, got: {result:?}");
    }

    #[test]
    fn missing_targets_file_is_reported_with_path() {
        let err = resolve_urls(Vec::new(), Path::new("/nonexistent/targets.yaml")).unwrap_err();
        assert!(
            format!("{err:#}").contains("/nonexistent/targets.yaml"),
            "got: {err:#}"
        );
    }

    #[test]
    fn fetcher_config_maps_app_config() {
        let fc = fetcher_config(&config(), None);
        assert_eq!(fc.request_timeout, Duration::from_secs(30));
        assert_eq!(fc.connect_timeout, Duration::from_secs(20));
        assert_eq!(fc.max_attempts, 3);
        assert_eq!(fc.backoff.min, Duration::from_millis(2000));
        assert_eq!(fc.backoff.max, Duration::from_millis(5000));
        assert_eq!(fc.max_idle_per_host, 2);
    }

    #[test]
    fn max_attempts_flag_overrides_config() {
        assert_eq!(fetcher_config(&config(), Some(1)).max_attempts, 1);
    }

    #[test]
    fn orchestrator_carries_concurrency_limits() {
        let orchestrator = build_orchestrator(&config(), None).unwrap();
        assert_eq!(
            orchestrator.limits(),
            ConcurrencyLimits {
                max_concurrent: 5,
                max_per_host: 2,
            }
        );
    }
}
