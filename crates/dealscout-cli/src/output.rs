//! Writes extraction results to timestamped JSON files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, TimeZone};
use dealscout_scraper::fetch::extract_host;
use dealscout_scraper::PageExtractionResult;
use serde::Serialize;

/// `YYYYmmdd_HHMMSS`, used in output file names.
pub(crate) fn timestamp_slug<Tz: TimeZone>(now: DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%Y%m%d_%H%M%S").to_string()
}

/// Directory name for a result's source domain. Characters that are unsafe
/// in a path segment become `_`.
pub(crate) fn domain_dir(url: &str) -> String {
    let host = extract_host(url);
    let cleaned: String = host
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches(|c| c == '.' || c == '_').is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

/// Saves `results` under `dir` and returns the files written.
///
/// Combined mode writes `<dir>/deals_<stamp>.json`; split mode writes
/// `<dir>/<domain>/deals_<stamp>.json` per source domain.
///
/// # Errors
///
/// Returns an error if a directory cannot be created or a file cannot be
/// written.
pub(crate) fn save_results(
    results: &[PageExtractionResult],
    dir: &Path,
    split_by_domain: bool,
    stamp: &str,
) -> anyhow::Result<Vec<PathBuf>> {
    let file_name = format!("deals_{stamp}.json");

    if !split_by_domain {
        let path = dir.join(&file_name);
        write_json(&path, results)?;
        return Ok(vec![path]);
    }

    let mut by_domain: BTreeMap<String, Vec<&PageExtractionResult>> = BTreeMap::new();
    for result in results {
        by_domain
            .entry(domain_dir(&result.url))
            .or_default()
            .push(result);
    }

    let mut written = Vec::with_capacity(by_domain.len());
    for (domain, group) in by_domain {
        let path = dir.join(&domain).join(&file_name);
        write_json(&path, &group)?;
        written.push(path);
    }
    Ok(written)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "saved results");
    Ok(())
}
