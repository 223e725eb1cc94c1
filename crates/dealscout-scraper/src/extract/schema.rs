//! Built-in selector cascades for storefront deal and product listings.
//!
//! Update this file when the storefront markup drifts. Within each chain,
//! order is priority: component markers and modern markup first, generic
//! layout classes last.

use std::sync::LazyLock;

use super::check::Check;
use super::field::FieldSpec;
use super::locator::{Locator, LocatorChain};
use super::record::Field;

fn css(selector: &str) -> Locator {
    Locator::css(selector).expect("valid built-in selector")
}

fn chain(selectors: &[&str]) -> LocatorChain {
    LocatorChain::from_selectors(selectors).expect("valid built-in selectors")
}

fn has(selector: &str, descendant: &str) -> Locator {
    css(selector)
        .containing(descendant)
        .expect("valid built-in selector")
}

/// Repeating deal/product blocks on a listing page.
pub static CONTAINERS: LazyLock<LocatorChain> = LazyLock::new(|| {
    chain(&[
        // Component markers.
        "div[data-component-type='s-deal-card']",
        "div[data-testid='deal-card']",
        "div[data-testid='product-card']",
        "div[data-asin]",
        // Section layouts.
        ".a-section.a-spacing-base",
        ".a-section.a-spacing-none.a-spacing-top-mini",
        ".a-section.a-spacing-medium",
        // Grid layouts.
        ".a-grid-row",
        ".a-row.a-size-base",
        ".a-section.a-spacing-none.a-spacing-top-base",
        ".a-section.a-spacing-none.a-spacing-top-small",
        ".a-section[data-asin]",
    ])
    .then(has("div.a-section", "[data-asin]"))
    .then(has("div", "a[href*='/dp/']"))
    .then(has("div", "img[src*='images']"))
});

const DISCOUNT_SELECTORS: [&str; 5] = [
    ".a-size-base.a-color-price",
    ".a-badge-text",
    ".a-color-secondary",
    ".a-size-base-plus.a-color-price",
    ".a-size-small.a-color-price",
];

/// Every chain-backed field, in extraction order.
pub static FIELDS: LazyLock<Vec<FieldSpec>> = LazyLock::new(|| {
    vec![
        FieldSpec::new(
            Field::Title,
            chain(&[
                "h2 a span",
                "h2 span",
                ".a-size-base-plus.a-color-base.a-text-normal",
                ".a-size-medium.a-color-base.a-text-normal",
                ".a-size-small.a-color-base.a-text-normal",
                "a[data-testid='deal-card-link'] span",
                ".a-link-normal.a-text-normal",
                ".a-link-normal span",
                "span.a-text-normal",
                "a span.a-text-normal",
                ".a-size-base-plus",
                ".a-size-medium",
                ".a-size-small",
            ]),
            Check::LongerThan(5),
        ),
        FieldSpec::new(
            Field::Link,
            chain(&[
                "h2 a",
                "a[data-testid='deal-card-link']",
                ".a-link-normal.a-text-normal",
                "a[href*='/dp/']",
                "a[href*='/gp/product/']",
            ])
            .then(has("a", "img"))
            .map(|l| l.attr("href")),
            Check::NonEmpty,
        ),
        FieldSpec::new(
            Field::Price,
            chain(&[
                ".a-price .a-offscreen",
                ".a-price-whole",
                ".a-price-current .a-offscreen",
                ".a-price .a-price-whole",
                ".a-price-current .a-price-whole",
                "span.a-price-whole",
                ".a-price-range .a-offscreen",
            ]),
            Check::ContainsDigit,
        ),
        FieldSpec::new(
            Field::OriginalPrice,
            chain(&[
                ".a-price.a-text-price .a-offscreen",
                ".a-text-strike",
                ".a-price.a-text-price .a-price-whole",
                ".a-price-range .a-text-price .a-offscreen",
            ]),
            Check::ContainsDigit,
        ),
        FieldSpec::new(
            Field::DiscountPercent,
            chain(&DISCOUNT_SELECTORS),
            Check::Percentage,
        ),
        FieldSpec::new(
            Field::DiscountText,
            chain(&DISCOUNT_SELECTORS),
            Check::NonEmpty,
        ),
        FieldSpec::new(
            Field::ImageUrl,
            chain(&[
                "img[data-src]",
                "img[src]",
                ".a-image-container img",
                "img.a-dynamic-image",
                "img[alt*='product']",
            ])
            .map(|l| l.first_attr(&["data-src", "src"])),
            Check::NotGif,
        ),
        FieldSpec::new(
            Field::Identifier,
            LocatorChain::new(vec![
                Locator::this().attr("data-asin"),
                css("[data-asin]").attr("data-asin"),
            ]),
            Check::NonEmpty,
        ),
        FieldSpec::new(
            Field::Rating,
            chain(&[
                ".a-icon-alt",
                ".a-size-base.a-color-secondary",
                "span[aria-label*='stars']",
                ".a-icon-star",
            ]),
            Check::RatingNumber,
        ),
        FieldSpec::new(
            Field::PrimeEligible,
            chain(&[
                ".a-icon-prime",
                ".a-icon-prime.a-icon-small",
                "span[aria-label*='Prime']",
            ])
            .map(Locator::presence),
            Check::NonEmpty,
        ),
        FieldSpec::new(
            Field::DealBadge,
            chain(&[
                ".a-badge-text",
                ".a-color-secondary",
                ".a-size-base-plus.a-color-price",
                ".a-size-small.a-color-price",
            ]),
            Check::DealKeyword,
        ),
    ]
});
