//! Page-level record extraction: container discovery, then one record per
//! container.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use super::field::{extract_field, FieldSpec};
use super::locator::LocatorChain;
use super::record::{Field, FieldValue, Record, RecordError};
use super::schema;

static DIV: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div").expect("valid selector"));
static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").expect("valid selector"));
static ANCHOR_HREF: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));
static PRODUCT_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("/dp/").expect("valid product path regex"));

pub const DEFAULT_MAX_RECORDS: usize = 20;
pub const DEFAULT_MIN_DOCUMENT_LEN: usize = 1000;
pub const DEFAULT_SCAN_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionLimits {
    /// Containers turned into records per page.
    pub max_records: usize,
    /// Shorter documents are treated as block or redirect pages.
    pub min_document_len: usize,
}

impl Default for ExtractionLimits {
    fn default() -> Self {
        Self {
            max_records: DEFAULT_MAX_RECORDS,
            min_document_len: DEFAULT_MIN_DOCUMENT_LEN,
        }
    }
}

/// Last-resort discovery when no container locator matches.
///
/// Looks at the first `scan_limit` `div`s in document order and keeps those
/// that carry `data-asin`, contain an image, or link to a product path.
#[derive(Debug, Clone)]
pub struct FallbackScan {
    pub scan_limit: usize,
    pub product_path: Regex,
}

impl FallbackScan {
    #[must_use]
    pub fn new(scan_limit: usize, product_path: Regex) -> Self {
        Self {
            scan_limit,
            product_path,
        }
    }

    fn is_candidate(&self, div: ElementRef<'_>) -> bool {
        div.value().attr("data-asin").is_some()
            || div.select(&IMG).next().is_some()
            || div.select(&ANCHOR_HREF).any(|a| {
                a.value()
                    .attr("href")
                    .is_some_and(|href| self.product_path.is_match(href))
            })
    }

    #[must_use]
    pub fn scan<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        document
            .select(&DIV)
            .take(self.scan_limit)
            .filter(|div| self.is_candidate(*div))
            .collect()
    }
}

impl Default for FallbackScan {
    fn default() -> Self {
        Self::new(DEFAULT_SCAN_LIMIT, PRODUCT_PATH.clone())
    }
}

/// How the containers on a page were found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    Locator {
        index: usize,
        source: String,
        count: usize,
    },
    FallbackScan {
        count: usize,
    },
    /// Nothing usable; also reported for documents that are too short.
    Empty,
}

#[derive(Debug, Clone)]
pub struct PageExtraction {
    pub records: Vec<Record>,
    pub discovery: Discovery,
    /// Containers found before the record cap was applied.
    pub candidates: usize,
    /// Containers within the cap that produced no record.
    pub skipped: usize,
}

impl PageExtraction {
    fn empty() -> Self {
        Self {
            records: Vec::new(),
            discovery: Discovery::Empty,
            candidates: 0,
            skipped: 0,
        }
    }
}

/// Turns a listing page into deal records using a container chain and a
/// list of field specs.
#[derive(Debug, Clone)]
pub struct PageExtractor {
    containers: LocatorChain,
    fields: Vec<FieldSpec>,
    limits: ExtractionLimits,
    fallback: FallbackScan,
}

impl Default for PageExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PageExtractor {
    /// Extractor using the built-in storefront schema.
    #[must_use]
    pub fn new() -> Self {
        Self::with_schema(schema::CONTAINERS.clone(), schema::FIELDS.clone())
    }

    #[must_use]
    pub fn with_schema(containers: LocatorChain, fields: Vec<FieldSpec>) -> Self {
        Self {
            containers,
            fields,
            limits: ExtractionLimits::default(),
            fallback: FallbackScan::default(),
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: ExtractionLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: FallbackScan) -> Self {
        self.fallback = fallback;
        self
    }

    #[must_use]
    pub fn limits(&self) -> ExtractionLimits {
        self.limits
    }

    /// Extracts up to `max_records` records from `html`.
    ///
    /// `page_url` is used to resolve relative links; pass `None` to keep
    /// links as they appear in the markup. Never fails: an unrecognisable
    /// page yields zero records.
    #[must_use]
    pub fn extract(&self, html: &str, page_url: Option<&str>) -> PageExtraction {
        if html.len() < self.limits.min_document_len {
            tracing::warn!(
                url = page_url,
                bytes = html.len(),
                min = self.limits.min_document_len,
                "document too short, likely a block or redirect page"
            );
            return PageExtraction::empty();
        }

        let document = Html::parse_document(html);
        let (discovery, elements) = self.discover(&document);
        if elements.is_empty() {
            tracing::warn!(url = page_url, "no deal containers found on page");
            return PageExtraction::empty();
        }

        let base = page_url.and_then(|u| Url::parse(u).ok());
        let candidates = elements.len();
        let mut records = Vec::new();
        let mut skipped = 0;
        for (position, element) in elements.into_iter().take(self.limits.max_records).enumerate() {
            match self.extract_record(element, base.as_ref()) {
                Ok(record) => records.push(record),
                Err(e) => {
                    skipped += 1;
                    tracing::debug!(url = page_url, position, error = %e, "skipping element");
                }
            }
        }

        tracing::info!(
            url = page_url,
            candidates,
            records = records.len(),
            skipped,
            "extracted records"
        );
        PageExtraction {
            records,
            discovery,
            candidates,
            skipped,
        }
    }

    /// Finds the repeating containers on a parsed page.
    #[must_use]
    pub fn discover<'a>(&self, document: &'a Html) -> (Discovery, Vec<ElementRef<'a>>) {
        if let Some((index, locator, found)) = self.containers.first_nonempty_match(document) {
            tracing::debug!(
                index,
                selector = locator.source(),
                count = found.len(),
                "container locator matched"
            );
            let discovery = Discovery::Locator {
                index,
                source: locator.source().to_owned(),
                count: found.len(),
            };
            return (discovery, found);
        }

        let found = self.fallback.scan(document);
        if found.is_empty() {
            return (Discovery::Empty, found);
        }
        tracing::info!(count = found.len(), "container locators failed, using fallback scan");
        (Discovery::FallbackScan { count: found.len() }, found)
    }

    /// Builds one record from a container.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Empty`] when no field could be extracted.
    pub fn extract_record(
        &self,
        element: ElementRef<'_>,
        base: Option<&Url>,
    ) -> Result<Record, RecordError> {
        let mut record = Record::default();
        for spec in &self.fields {
            let Some(value) = extract_field(element, spec) else {
                continue;
            };
            let value = match (spec.field, value, base) {
                (Field::Link, FieldValue::Text(href), Some(base)) => {
                    FieldValue::Text(resolve_link(base, &href))
                }
                (_, value, _) => value,
            };
            record.insert(spec.field, value);
        }
        record.finish()
    }
}

/// Absolute form of `href`; unparseable links are kept as written.
fn resolve_link(base: &Url, href: &str) -> String {
    base.join(href)
        .map_or_else(|_| href.to_owned(), String::from)
}

#[cfg(test)]
#[path = "page_test.rs"]
mod tests;
