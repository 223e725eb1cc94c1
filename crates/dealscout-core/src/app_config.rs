use std::path::PathBuf;

/// Runtime settings, loaded once at startup from `DEALSCOUT_*` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub log_level: String,
    pub targets_path: PathBuf,
    pub output_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Fetch attempts per URL, at least 1.
    pub max_attempts: u32,
    pub backoff_min_ms: u64,
    pub backoff_max_ms: u64,
    /// Global cap on in-flight URL pipelines.
    pub max_concurrent: usize,
    /// Per-host cap; below `max_concurrent` unless that is 1.
    pub max_per_host: usize,
    pub max_records_per_page: usize,
    pub fallback_scan_limit: usize,
}
