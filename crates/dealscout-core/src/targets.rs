use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::ConfigError;

/// One listing page to scrape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub url: String,
    pub label: Option<String>,
}

impl Target {
    /// Label if set, else the URL's host.
    #[must_use]
    pub fn display_name(&self) -> String {
        if let Some(label) = self.label.as_deref().filter(|l| !l.trim().is_empty()) {
            return label.to_string();
        }
        Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| self.url.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetsFile {
    pub targets: Vec<Target>,
}

impl TargetsFile {
    /// Target URLs in file order.
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        self.targets.iter().map(|t| t.url.clone()).collect()
    }
}

/// Load and validate the targets list from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_targets(path: &Path) -> Result<TargetsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::TargetsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let mut targets_file: TargetsFile = serde_yaml::from_str(&content)?;
    for target in &mut targets_file.targets {
        target.url = target.url.trim().to_string();
    }

    validate_targets(&targets_file)?;

    Ok(targets_file)
}

/// Checks that a single URL is an absolute `http`/`https` URL with a host.
///
/// # Errors
///
/// Returns `ConfigError::Validation` naming the offending URL.
pub fn validate_target_url(raw: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(raw)
        .map_err(|e| ConfigError::Validation(format!("invalid target URL '{raw}': {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::Validation(format!(
            "target URL '{raw}' must use http or https, not '{}'",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::Validation(format!(
            "target URL '{raw}' has no host"
        )));
    }
    Ok(())
}

/// Validates a list of URLs: non-empty, each well formed, no duplicates.
///
/// # Errors
///
/// Returns `ConfigError::Validation` for the first problem found.
pub fn validate_urls<'a>(urls: impl IntoIterator<Item = &'a str>) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for url in urls {
        validate_target_url(url)?;
        if !seen.insert(url) {
            return Err(ConfigError::Validation(format!(
                "duplicate target URL: '{url}'"
            )));
        }
    }
    if seen.is_empty() {
        return Err(ConfigError::Validation(
            "at least one target URL is required".to_string(),
        ));
    }
    Ok(())
}

/// Trims each URL and validates the result, returning the URLs as they
/// should be fetched.
///
/// # Errors
///
/// Returns `ConfigError::Validation` for the first problem found.
pub fn normalize_urls(urls: Vec<String>) -> Result<Vec<String>, ConfigError> {
    let urls: Vec<String> = urls.into_iter().map(|u| u.trim().to_string()).collect();
    validate_urls(urls.iter().map(String::as_str))?;
    Ok(urls)
}

fn validate_targets(targets_file: &TargetsFile) -> Result<(), ConfigError> {
    validate_urls(targets_file.targets.iter().map(|t| t.url.as_str()))
}

#[cfg(test)]
#[path = "targets_test.rs"]
mod tests;
