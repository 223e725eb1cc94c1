use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid selector \"{selector}\": {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("invalid request header \"{name}\": {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("no target URLs supplied")]
    EmptyTargets,
}
