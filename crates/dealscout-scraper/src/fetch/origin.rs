//! URL origin and host extraction for target pages.

/// Extracts the scheme+host origin from a target URL.
///
/// Given `"https://www.amazon.in/deals?ref_=nav"`, returns
/// `Some("https://www.amazon.in")`. Returns `None` for URLs that do not parse
/// or are not `http`/`https` with a host.
#[must_use]
pub fn extract_origin(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return None;
    }
    Some(parsed.origin().ascii_serialization())
}

/// Extracts the hostname from a target URL.
///
/// Falls back to the full URL string if parsing fails.
#[must_use]
pub fn extract_host(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}

/// Key used to group connections per target host: `host:port`, with the
/// scheme's default port filled in.
#[must_use]
pub fn host_key(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(u) => match (u.host_str(), u.port_or_known_default()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_owned(),
            _ => url.to_owned(),
        },
        Err(_) => url.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_strips_path_and_query() {
        assert_eq!(
            extract_origin("https://www.amazon.in/deals?ref_=nav_cs_gb").as_deref(),
            Some("https://www.amazon.in")
        );
    }

    #[test]
    fn origin_keeps_non_default_port() {
        assert_eq!(
            extract_origin("http://127.0.0.1:8080/page").as_deref(),
            Some("http://127.0.0.1:8080")
        );
    }

    #[test]
    fn origin_rejects_non_http_schemes() {
        assert!(extract_origin("mailto:deals@example.com").is_none());
        assert!(extract_origin("not a url").is_none());
    }

    #[test]
    fn host_strips_scheme_and_path() {
        assert_eq!(extract_host("https://www.amazon.in/gp/goldbox"), "www.amazon.in");
    }

    #[test]
    fn host_fallback_no_scheme() {
        assert_eq!(extract_host("amazon.in"), "amazon.in");
    }

    #[test]
    fn host_key_fills_default_port() {
        assert_eq!(host_key("https://www.amazon.in/deals"), "www.amazon.in:443");
        assert_eq!(host_key("http://localhost:9000/x"), "localhost:9000");
    }
}
