use std::path::{Path, PathBuf};

use super::*;

fn target(url: &str) -> Target {
    Target {
        url: url.to_string(),
        label: None,
    }
}

fn file_of(urls: &[&str]) -> TargetsFile {
    TargetsFile {
        targets: urls.iter().map(|u| target(u)).collect(),
    }
}

/// Writes `content` to a per-test file under the system temp dir.
fn write_temp(name: &str, content: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("dealscout-targets-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn validate_accepts_http_and_https() {
    let file = file_of(&["https://www.amazon.in/deals", "http://shop.test/offers"]);
    assert!(validate_targets(&file).is_ok());
}

#[test]
fn validate_rejects_empty_list() {
    let err = validate_targets(&file_of(&[])).unwrap_err();
    assert!(
        matches!(err, ConfigError::Validation(ref m) if m.contains("at least one")),
        "expected empty-list validation error, got: {err:?}"
    );
}

#[test]
fn validate_rejects_unsupported_scheme() {
    let err = validate_targets(&file_of(&["ftp://files.test/deals"])).unwrap_err();
    assert!(err.to_string().contains("http or https"), "got: {err}");
}

#[test]
fn validate_rejects_relative_url() {
    let err = validate_targets(&file_of(&["/deals?ref_=nav"])).unwrap_err();
    assert!(err.to_string().contains("invalid target URL"), "got: {err}");
}

#[test]
fn validate_rejects_duplicates() {
    let err = validate_targets(&file_of(&[
        "https://www.amazon.in/deals",
        "https://www.amazon.in/deals",
    ]))
    .unwrap_err();
    assert!(err.to_string().contains("duplicate target URL"), "got: {err}");
}

#[test]
fn normalize_trims_before_validating_and_dedup() {
    let urls = normalize_urls(vec![
        "  https://shop.test/a\n".to_string(),
        "https://shop.test/b".to_string(),
    ])
    .unwrap();
    assert_eq!(urls, vec!["https://shop.test/a", "https://shop.test/b"]);

    let err = normalize_urls(vec![
        "https://shop.test/a".to_string(),
        " https://shop.test/a ".to_string(),
    ])
    .unwrap_err();
    assert!(err.to_string().contains("duplicate target URL"), "got: {err}");
}

#[test]
fn load_targets_trims_urls() {
    let path = write_temp(
        "padded.yaml",
        "targets:\n  - url: \"  https://shop.test/padded  \"\n",
    );
    let file = load_targets(&path).unwrap();
    assert_eq!(file.urls(), vec!["https://shop.test/padded"]);
}

#[test]
fn display_name_prefers_label_then_host() {
    let labelled = Target {
        url: "https://www.amazon.in/deals".to_string(),
        label: Some("deals".to_string()),
    };
    assert_eq!(labelled.display_name(), "deals");
    assert_eq!(target("https://www.amazon.in/deals").display_name(), "www.amazon.in");
}

#[test]
fn load_targets_parses_labels_and_order() {
    let path = write_temp(
        "ordered.yaml",
        "targets:\n  - url: https://shop.test/a\n    label: first\n  - url: https://shop.test/b\n",
    );
    let file = load_targets(&path).unwrap();
    assert_eq!(file.urls(), vec!["https://shop.test/a", "https://shop.test/b"]);
    assert_eq!(file.targets[0].label.as_deref(), Some("first"));
    assert_eq!(file.targets[1].label, None);
}

#[test]
fn load_targets_reports_missing_file() {
    let result = load_targets(Path::new("/nonexistent/dealscout/targets.yaml"));
    assert!(
        matches!(result, Err(ConfigError::TargetsFileIo { .. })),
        "expected TargetsFileIo, got: {result:?}"
    );
}

#[test]
fn load_targets_reports_malformed_yaml() {
    let path = write_temp("malformed.yaml", "targets: [url: {\n");
    let result = load_targets(&path);
    assert!(
        matches!(result, Err(ConfigError::TargetsFileParse(_))),
        "expected TargetsFileParse, got: {result:?}"
    );
}

#[test]
fn load_targets_from_real_file() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("config")
        .join("targets.yaml");
    assert!(path.exists(), "targets.yaml missing at {path:?}");
    let file = load_targets(&path).expect("failed to load targets.yaml");
    assert!(!file.targets.is_empty());
}
