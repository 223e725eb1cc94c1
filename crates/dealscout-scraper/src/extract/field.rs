//! First-validated-match-wins field extraction.

use scraper::ElementRef;

use super::check::Check;
use super::locator::{Located, LocatorChain};
use super::record::{Field, FieldValue};

/// A schema field: which chain locates it and what it must look like.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub field: Field,
    pub chain: LocatorChain,
    pub check: Check,
}

impl FieldSpec {
    #[must_use]
    pub fn new(field: Field, chain: LocatorChain, check: Check) -> Self {
        Self {
            field,
            chain,
            check,
        }
    }
}

/// Walks `spec.chain` in order and returns the first value that passes
/// `spec.check`.
///
/// Each locator contributes only its first matching node. If that node's
/// value is missing or rejected, the next locator is tried; later nodes of
/// the same locator are not. `None` means the field is missing, which is
/// not an error.
#[must_use]
pub fn extract_field(element: ElementRef<'_>, spec: &FieldSpec) -> Option<FieldValue> {
    for locator in &spec.chain {
        let Some(node) = locator.find_first(element) else {
            continue;
        };
        match locator.read(node) {
            Some(Located::Present) => return Some(FieldValue::Flag(true)),
            Some(Located::Value(raw)) => {
                if let Some(value) = spec.check.apply(&raw) {
                    tracing::trace!(
                        field = ?spec.field,
                        selector = locator.source(),
                        "field matched"
                    );
                    return Some(FieldValue::Text(value));
                }
            }
            None => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};

    use crate::extract::locator::Locator;
    use super::*;

    fn card(doc: &Html) -> ElementRef<'_> {
        doc.select(&Selector::parse("div.card").unwrap())
            .next()
            .unwrap()
    }

    fn title_spec(selectors: &[&str]) -> FieldSpec {
        FieldSpec::new(
            Field::Title,
            LocatorChain::from_selectors(selectors).unwrap(),
            Check::LongerThan(5),
        )
    }

    #[test]
    fn earlier_locator_wins_even_when_later_node_comes_first_in_document() {
        let doc = Html::parse_fragment(
            r#"<div class="card"><span class="generic">Generic fallback title</span><h2><span>Specific modern title</span></h2></div>"#,
        );
        let spec = title_spec(&["h2 span", "span.generic"]);
        assert_eq!(
            extract_field(card(&doc), &spec),
            Some(FieldValue::Text("Specific modern title".to_owned()))
        );
    }

    #[test]
    fn rejected_value_falls_through_to_next_locator() {
        let doc = Html::parse_fragment(
            r#"<div class="card"><h2><span>New</span></h2><span class="generic">Fallback product title</span></div>"#,
        );
        let spec = title_spec(&["h2 span", "span.generic"]);
        assert_eq!(
            extract_field(card(&doc), &spec),
            Some(FieldValue::Text("Fallback product title".to_owned()))
        );
    }

    #[test]
    fn only_first_node_of_a_locator_is_considered() {
        let doc = Html::parse_fragment(
            r#"<div class="card"><h2><span>Tiny</span></h2><h2><span>Second heading text</span></h2></div>"#,
        );
        let spec = title_spec(&["h2 span"]);
        assert_eq!(extract_field(card(&doc), &spec), None);
    }

    #[test]
    fn exhausted_chain_is_none() {
        let doc = Html::parse_fragment(r#"<div class="card"><p>nothing useful</p></div>"#);
        let spec = title_spec(&["h2 span", ".a-size-medium"]);
        assert_eq!(extract_field(card(&doc), &spec), None);
    }

    #[test]
    fn missing_attribute_falls_through() {
        let doc = Html::parse_fragment(
            r#"<div class="card"><h2><a>no href</a></h2><a href="/dp/B0X">link</a></div>"#,
        );
        let spec = FieldSpec::new(
            Field::Link,
            LocatorChain::from_selectors(&["h2 a", "a[href*='/dp/']"])
                .unwrap()
                .map(|l| l.attr("href")),
            Check::NonEmpty,
        );
        assert_eq!(
            extract_field(card(&doc), &spec),
            Some(FieldValue::Text("/dp/B0X".to_owned()))
        );
    }

    #[test]
    fn presence_becomes_flag() {
        let doc = Html::parse_fragment(r#"<div class="card"><i class="a-icon-prime"></i></div>"#);
        let spec = FieldSpec::new(
            Field::PrimeEligible,
            LocatorChain::new(vec![Locator::css(".a-icon-prime").unwrap().presence()]),
            Check::NonEmpty,
        );
        assert_eq!(extract_field(card(&doc), &spec), Some(FieldValue::Flag(true)));
    }

    #[test]
    fn refined_value_is_returned() {
        let doc = Html::parse_fragment(
            r#"<div class="card"><span class="a-icon-alt">4.4 out of 5 stars</span></div>"#,
        );
        let spec = FieldSpec::new(
            Field::Rating,
            LocatorChain::from_selectors(&[".a-icon-alt"]).unwrap(),
            Check::RatingNumber,
        );
        assert_eq!(
            extract_field(card(&doc), &spec),
            Some(FieldValue::Text("4.4".to_owned()))
        );
    }
}
