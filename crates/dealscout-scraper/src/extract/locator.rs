//! Declarative selector cascades.
//!
//! A [`Locator`] names one place a value might live: a CSS selector (or the
//! candidate element itself), an optional "must contain a descendant
//! matching X" filter, and how to read the value once found. A
//! [`LocatorChain`] orders locators from the most specific markup to the most
//! generic fallback; callers always take the first locator that works.

use scraper::{ElementRef, Html, Selector};

use crate::error::ScraperError;

/// How a located node yields its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// Normalised text content.
    Text,
    /// A single attribute value.
    Attribute(&'static str),
    /// The first of several attributes that is present.
    FirstAttribute(&'static [&'static str]),
    /// The node merely existing is the value.
    Presence,
}

/// Raw value read from a located node, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    Value(String),
    Present,
}

#[derive(Debug, Clone)]
pub struct Locator {
    source: String,
    /// `None` targets the candidate element itself.
    target: Option<Selector>,
    requires: Option<(String, Selector)>,
    extraction: Extraction,
}

fn parse_selector(selector: &str) -> Result<Selector, ScraperError> {
    Selector::parse(selector).map_err(|e| ScraperError::InvalidSelector {
        selector: selector.to_owned(),
        reason: e.to_string(),
    })
}

impl Locator {
    /// Text locator for the first descendant matching `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidSelector`] if `selector` is not valid CSS.
    pub fn css(selector: &str) -> Result<Self, ScraperError> {
        Ok(Self {
            source: selector.to_owned(),
            target: Some(parse_selector(selector)?),
            requires: None,
            extraction: Extraction::Text,
        })
    }

    /// Locator targeting the candidate element itself.
    #[must_use]
    pub fn this() -> Self {
        Self {
            source: ":self".to_owned(),
            target: None,
            requires: None,
            extraction: Extraction::Text,
        }
    }

    /// Only matches nodes that contain a descendant matching `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidSelector`] if `selector` is not valid CSS.
    pub fn containing(mut self, selector: &str) -> Result<Self, ScraperError> {
        let parsed = parse_selector(selector)?;
        self.source = format!("{}:has({selector})", self.source);
        self.requires = Some((selector.to_owned(), parsed));
        Ok(self)
    }

    #[must_use]
    pub fn attr(mut self, name: &'static str) -> Self {
        self.extraction = Extraction::Attribute(name);
        self
    }

    #[must_use]
    pub fn first_attr(mut self, names: &'static [&'static str]) -> Self {
        self.extraction = Extraction::FirstAttribute(names);
        self
    }

    #[must_use]
    pub fn presence(mut self) -> Self {
        self.extraction = Extraction::Presence;
        self
    }

    /// Human-readable form of the locator, for logs.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn extraction(&self) -> Extraction {
        self.extraction
    }

    fn satisfies_requirement(&self, node: ElementRef<'_>) -> bool {
        self.requires
            .as_ref()
            .is_none_or(|(_, required)| node.select(required).next().is_some())
    }

    /// First node under `element` this locator matches, in document order.
    #[must_use]
    pub fn find_first<'a>(&self, element: ElementRef<'a>) -> Option<ElementRef<'a>> {
        match &self.target {
            None => self.satisfies_requirement(element).then_some(element),
            Some(selector) => element
                .select(selector)
                .find(|node| self.satisfies_requirement(*node)),
        }
    }

    /// Every node in `document` this locator matches, in document order.
    #[must_use]
    pub fn find_all<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        match &self.target {
            None => vec![document.root_element()],
            Some(selector) => document
                .select(selector)
                .filter(|node| self.satisfies_requirement(*node))
                .collect(),
        }
    }

    /// Reads the value from an already-located node.
    #[must_use]
    pub fn read(&self, node: ElementRef<'_>) -> Option<Located> {
        match self.extraction {
            Extraction::Text => {
                let text = normalize_text(node);
                (!text.is_empty()).then_some(Located::Value(text))
            }
            Extraction::Attribute(name) => attr_value(node, name).map(Located::Value),
            Extraction::FirstAttribute(names) => names
                .iter()
                .find_map(|name| attr_value(node, name))
                .map(Located::Value),
            Extraction::Presence => Some(Located::Present),
        }
    }
}

fn attr_value(node: ElementRef<'_>, name: &str) -> Option<String> {
    node.value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Text content with leading/trailing whitespace trimmed and internal runs
/// collapsed to a single space.
#[must_use]
pub fn normalize_text(node: ElementRef<'_>) -> String {
    node.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Priority-ordered locators for one field or container type.
#[derive(Debug, Clone, Default)]
pub struct LocatorChain {
    locators: Vec<Locator>,
}

impl LocatorChain {
    #[must_use]
    pub fn new(locators: Vec<Locator>) -> Self {
        Self { locators }
    }

    /// Chain of plain text locators, one per selector, in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidSelector`] for the first invalid selector.
    pub fn from_selectors(selectors: &[&str]) -> Result<Self, ScraperError> {
        selectors
            .iter()
            .map(|s| Locator::css(s))
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    /// Appends a lower-priority locator.
    #[must_use]
    pub fn then(mut self, locator: Locator) -> Self {
        self.locators.push(locator);
        self
    }

    /// Applies `f` to every locator, e.g. to switch a whole chain to
    /// attribute extraction.
    #[must_use]
    pub fn map(self, f: impl Fn(Locator) -> Locator) -> Self {
        Self {
            locators: self.locators.into_iter().map(f).collect(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Locator> {
        self.locators.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.locators.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }

    /// Elements matched by the first locator that matches anything, with
    /// that locator's position in the chain.
    #[must_use]
    pub fn first_nonempty_match<'a>(
        &self,
        document: &'a Html,
    ) -> Option<(usize, &Locator, Vec<ElementRef<'a>>)> {
        self.locators.iter().enumerate().find_map(|(i, locator)| {
            let found = locator.find_all(document);
            tracing::trace!(selector = locator.source(), count = found.len(), "container probe");
            (!found.is_empty()).then_some((i, locator, found))
        })
    }
}

impl<'a> IntoIterator for &'a LocatorChain {
    type Item = &'a Locator;
    type IntoIter = std::slice::Iter<'a, Locator>;

    fn into_iter(self) -> Self::IntoIter {
        self.locators.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_div(doc: &Html) -> ElementRef<'_> {
        doc.select(&Selector::parse("div").unwrap()).next().unwrap()
    }

    #[test]
    fn invalid_selector_is_reported() {
        let err = Locator::css("div[").unwrap_err();
        assert!(matches!(err, ScraperError::InvalidSelector { .. }));
    }

    #[test]
    fn text_is_trimmed_and_collapsed() {
        let doc = Html::parse_fragment("<div><h2>  Noise\n   Cancelling <b>Headphones</b> </h2></div>");
        let locator = Locator::css("h2").unwrap();
        let node = locator.find_first(first_div(&doc)).unwrap();
        assert_eq!(
            locator.read(node),
            Some(Located::Value("Noise Cancelling Headphones".to_owned()))
        );
    }

    #[test]
    fn whitespace_only_text_reads_as_none() {
        let doc = Html::parse_fragment("<div><span>   </span></div>");
        let locator = Locator::css("span").unwrap();
        let node = locator.find_first(first_div(&doc)).unwrap();
        assert_eq!(locator.read(node), None);
    }

    #[test]
    fn first_attr_prefers_earlier_names() {
        let doc = Html::parse_fragment(
            r#"<div><img data-src="https://cdn.test/real.jpg" src="https://cdn.test/lazy.jpg"></div>"#,
        );
        let locator = Locator::css("img").unwrap().first_attr(&["data-src", "src"]);
        let node = locator.find_first(first_div(&doc)).unwrap();
        assert_eq!(
            locator.read(node),
            Some(Located::Value("https://cdn.test/real.jpg".to_owned()))
        );
    }

    #[test]
    fn containing_filters_matches() {
        let doc = Html::parse_fragment(
            r#"<div><a href="/help">Help</a><a href="/dp/B01"><img src="x.jpg"></a></div>"#,
        );
        let locator = Locator::css("a")
            .unwrap()
            .containing("img")
            .unwrap()
            .attr("href");
        let node = locator.find_first(first_div(&doc)).unwrap();
        assert_eq!(locator.read(node), Some(Located::Value("/dp/B01".to_owned())));
        assert_eq!(locator.source(), "a:has(img)");
    }

    #[test]
    fn this_reads_from_the_element_itself() {
        let doc = Html::parse_fragment(r#"<div data-asin="B0TEST"><span>x</span></div>"#);
        let locator = Locator::this().attr("data-asin");
        let node = locator.find_first(first_div(&doc)).unwrap();
        assert_eq!(locator.read(node), Some(Located::Value("B0TEST".to_owned())));
    }

    #[test]
    fn presence_needs_no_content() {
        let doc = Html::parse_fragment(r#"<div><i class="a-icon-prime"></i></div>"#);
        let locator = Locator::css(".a-icon-prime").unwrap().presence();
        let node = locator.find_first(first_div(&doc)).unwrap();
        assert_eq!(locator.read(node), Some(Located::Present));
    }

    #[test]
    fn chain_uses_first_locator_with_any_match() {
        let doc = Html::parse_document(
            r#"<html><body><section class="card">1</section><div class="tile">a</div><div class="tile">b</div></body></html>"#,
        );
        let chain = LocatorChain::from_selectors(&["article.card", "div.tile", "section.card"]).unwrap();
        let (index, locator, found) = chain.first_nonempty_match(&doc).unwrap();
        assert_eq!(index, 1);
        assert_eq!(locator.source(), "div.tile");
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn chain_without_matches_is_none() {
        let doc = Html::parse_document("<html><body><p>nothing</p></body></html>");
        let chain = LocatorChain::from_selectors(&["div.card"]).unwrap();
        assert!(chain.first_nonempty_match(&doc).is_none());
    }
}
