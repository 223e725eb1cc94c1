use crate::app_config::AppConfig;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value does not parse or violates a bound.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value does not parse or violates a bound.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every variable has a default; tests drive this with a `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let log_level = or_default("DEALSCOUT_LOG_LEVEL", "info");
    let targets_path = PathBuf::from(or_default(
        "DEALSCOUT_TARGETS_PATH",
        "./config/targets.yaml",
    ));
    let output_dir = PathBuf::from(or_default("DEALSCOUT_OUTPUT_DIR", "./output"));

    let request_timeout_secs = parse_u64("DEALSCOUT_REQUEST_TIMEOUT_SECS", "30")?;
    let connect_timeout_secs = parse_u64("DEALSCOUT_CONNECT_TIMEOUT_SECS", "20")?;
    let max_attempts = parse_u32("DEALSCOUT_MAX_ATTEMPTS", "3")?;
    let backoff_min_ms = parse_u64("DEALSCOUT_BACKOFF_MIN_MS", "2000")?;
    let backoff_max_ms = parse_u64("DEALSCOUT_BACKOFF_MAX_MS", "5000")?;
    let max_concurrent = parse_usize("DEALSCOUT_MAX_CONCURRENT", "5")?;
    let max_per_host = parse_usize("DEALSCOUT_MAX_PER_HOST", "2")?;
    let max_records_per_page = parse_usize("DEALSCOUT_MAX_RECORDS_PER_PAGE", "20")?;
    let fallback_scan_limit = parse_usize("DEALSCOUT_FALLBACK_SCAN_LIMIT", "50")?;

    if request_timeout_secs == 0 {
        return Err(invalid(
            "DEALSCOUT_REQUEST_TIMEOUT_SECS",
            "must be at least 1".to_string(),
        ));
    }
    if connect_timeout_secs == 0 {
        return Err(invalid(
            "DEALSCOUT_CONNECT_TIMEOUT_SECS",
            "must be at least 1".to_string(),
        ));
    }
    if max_attempts == 0 {
        return Err(invalid(
            "DEALSCOUT_MAX_ATTEMPTS",
            "must be at least 1".to_string(),
        ));
    }
    if backoff_min_ms > backoff_max_ms {
        return Err(invalid(
            "DEALSCOUT_BACKOFF_MIN_MS",
            format!("{backoff_min_ms} exceeds DEALSCOUT_BACKOFF_MAX_MS ({backoff_max_ms})"),
        ));
    }
    if max_concurrent == 0 {
        return Err(invalid(
            "DEALSCOUT_MAX_CONCURRENT",
            "must be at least 1".to_string(),
        ));
    }
    validate_per_host(max_per_host, max_concurrent)
        .map_err(|reason| invalid("DEALSCOUT_MAX_PER_HOST", reason))?;

    Ok(AppConfig {
        log_level,
        targets_path,
        output_dir,
        request_timeout_secs,
        connect_timeout_secs,
        max_attempts,
        backoff_min_ms,
        backoff_max_ms,
        max_concurrent,
        max_per_host,
        max_records_per_page,
        fallback_scan_limit,
    })
}

/// The per-host cap must be positive and strictly below the global cap.
/// A global cap of 1 admits only a per-host cap of 1.
fn validate_per_host(max_per_host: usize, max_concurrent: usize) -> Result<(), String> {
    if max_per_host == 0 {
        return Err("must be at least 1".to_string());
    }
    if max_concurrent > 1 && max_per_host >= max_concurrent {
        return Err(format!(
            "{max_per_host} must be less than DEALSCOUT_MAX_CONCURRENT ({max_concurrent})"
        ));
    }
    if max_concurrent == 1 && max_per_host > 1 {
        return Err(format!(
            "{max_per_host} exceeds DEALSCOUT_MAX_CONCURRENT (1)"
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
