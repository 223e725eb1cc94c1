//! Validation rules applied to a located value before a field accepts it.

use std::sync::LazyLock;

use regex::Regex;

static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*%").expect("valid percent regex"));
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)").expect("valid number regex"));

const DEAL_KEYWORDS: [&str; 5] = ["deal", "off", "save", "discount", "%"];

/// Acceptance rule (and optional refinement) for a located value.
///
/// A rule that rejects a value sends the field on to the next locator in
/// its chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    NonEmpty,
    /// More than `n` characters; filters out stray icon labels.
    LongerThan(usize),
    ContainsDigit,
    /// Text containing `N%`; refined to just `"N%"`.
    Percentage,
    /// Text containing a number; refined to the first number.
    RatingNumber,
    /// Rejects `.gif` URLs, which are lazy-load placeholders.
    NotGif,
    /// Contains one of deal/off/save/discount/% (case-insensitive).
    DealKeyword,
}

impl Check {
    /// Returns the accepted (possibly refined) value, or `None` to reject.
    #[must_use]
    pub fn apply(self, raw: &str) -> Option<String> {
        if raw.is_empty() {
            return None;
        }
        match self {
            Self::NonEmpty => Some(raw.to_owned()),
            Self::LongerThan(n) => (raw.chars().count() > n).then(|| raw.to_owned()),
            Self::ContainsDigit => raw
                .chars()
                .any(|c| c.is_ascii_digit())
                .then(|| raw.to_owned()),
            Self::Percentage => PERCENT_RE
                .captures(raw)
                .map(|caps| format!("{}%", &caps[1])),
            Self::RatingNumber => NUMBER_RE.captures(raw).map(|caps| caps[1].to_owned()),
            Self::NotGif => {
                let path = raw.split(['?', '#']).next().unwrap_or(raw);
                (!path.to_ascii_lowercase().ends_with(".gif")).then(|| raw.to_owned())
            }
            Self::DealKeyword => {
                let lower = raw.to_lowercase();
                DEAL_KEYWORDS
                    .iter()
                    .any(|kw| lower.contains(kw))
                    .then(|| raw.to_owned())
            }
        }
    }
}
