//! Fetch outcome types and per-attempt classification.

use reqwest::StatusCode;
use serde::Serialize;

/// Why a fetch attempt (or the whole attempt sequence) failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    /// HTTP 503, the storefront's usual anti-bot response.
    Blocked,
    /// Any other non-200 status.
    HttpError,
    /// Connect or total timeout exceeded.
    Timeout,
    /// Connection refused, TLS failure, body decode failure and the like.
    TransportError,
}

impl FailureReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blocked => "blocked",
            Self::HttpError => "http-error",
            Self::Timeout => "timeout",
            Self::TransportError => "transport-error",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one complete attempt sequence against a URL.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub url: String,
    /// Response body of the successful attempt.
    pub html: Option<String>,
    pub succeeded: bool,
    /// Classification of the last failed attempt; `None` on success.
    pub failure_reason: Option<FailureReason>,
    /// Number of requests actually sent.
    pub attempts: u32,
    /// Last HTTP status observed, if any attempt got that far.
    pub last_status: Option<u16>,
}

impl FetchResult {
    pub(crate) fn success(url: &str, html: String, attempts: u32) -> Self {
        Self {
            url: url.to_owned(),
            html: Some(html),
            succeeded: true,
            failure_reason: None,
            attempts,
            last_status: Some(StatusCode::OK.as_u16()),
        }
    }

    pub(crate) fn failure(
        url: &str,
        reason: FailureReason,
        attempts: u32,
        last_status: Option<u16>,
    ) -> Self {
        Self {
            url: url.to_owned(),
            html: None,
            succeeded: false,
            failure_reason: Some(reason),
            attempts,
            last_status,
        }
    }

    /// Human-readable failure description, e.g.
    /// `"blocked (HTTP 503) after 3 attempts"`. `None` on success.
    #[must_use]
    pub fn failure_message(&self) -> Option<String> {
        let reason = self.failure_reason?;
        let plural = if self.attempts == 1 { "" } else { "s" };
        Some(match self.last_status {
            Some(status) if matches!(reason, FailureReason::Blocked | FailureReason::HttpError) => {
                format!(
                    "{reason} (HTTP {status}) after {} attempt{plural}",
                    self.attempts
                )
            }
            _ => format!("{reason} after {} attempt{plural}", self.attempts),
        })
    }
}

/// Classifies a response status. `None` means success.
pub(crate) fn classify_status(status: StatusCode) -> Option<FailureReason> {
    if status == StatusCode::OK {
        None
    } else if status == StatusCode::SERVICE_UNAVAILABLE {
        Some(FailureReason::Blocked)
    } else {
        Some(FailureReason::HttpError)
    }
}

/// Classifies a transport-level error from the HTTP client.
pub(crate) fn classify_transport(err: &reqwest::Error) -> FailureReason {
    if err.is_timeout() {
        FailureReason::Timeout
    } else {
        FailureReason::TransportError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_is_success() {
        assert_eq!(classify_status(StatusCode::OK), None);
    }

    #[test]
    fn service_unavailable_is_blocked() {
        assert_eq!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE),
            Some(FailureReason::Blocked)
        );
    }

    #[test]
    fn other_statuses_are_http_errors() {
        for status in [
            StatusCode::NOT_FOUND,
            StatusCode::FORBIDDEN,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::NO_CONTENT,
        ] {
            assert_eq!(
                classify_status(status),
                Some(FailureReason::HttpError),
                "status {status}"
            );
        }
    }

    #[test]
    fn reasons_render_kebab_case() {
        assert_eq!(FailureReason::HttpError.to_string(), "http-error");
        assert_eq!(
            serde_json::to_value(FailureReason::TransportError).unwrap(),
            serde_json::json!("transport-error")
        );
    }

    #[test]
    fn failure_message_mentions_status_for_http_failures() {
        let result = FetchResult::failure("https://x.test", FailureReason::Blocked, 3, Some(503));
        assert_eq!(
            result.failure_message().as_deref(),
            Some("blocked (HTTP 503) after 3 attempts")
        );
    }

    #[test]
    fn failure_message_omits_status_for_timeouts() {
        let result = FetchResult::failure("https://x.test", FailureReason::Timeout, 1, None);
        assert_eq!(
            result.failure_message().as_deref(),
            Some("timeout after 1 attempt")
        );
    }

    #[test]
    fn success_has_no_failure_message() {
        let result = FetchResult::success("https://x.test", "<html></html>".to_owned(), 1);
        assert!(result.failure_message().is_none());
        assert!(result.succeeded);
    }
}
