//! Typed deal records and the derived discount calculation.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:₹|Rs\.?|\$|€|£)?\s*(\d[\d,]*(?:\.\d*)?)$").expect("valid amount regex")
});

/// One attribute of a deal record. Declaration order is serialisation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    Link,
    Price,
    OriginalPrice,
    DiscountPercent,
    DiscountText,
    CalculatedDiscount,
    Savings,
    ImageUrl,
    Identifier,
    Rating,
    PrimeEligible,
    DealBadge,
}

impl Field {
    /// Fields computed from other fields rather than located in markup.
    #[must_use]
    pub fn is_derived(self) -> bool {
        matches!(self, Self::CalculatedDiscount | Self::Savings)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
}

impl FieldValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Flag(_) => None,
        }
    }
}

/// Per-element extraction failure. The element is skipped, the page is not.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("no field could be extracted from the element")]
    Empty,
}

/// One extracted item. Serialises as a flat JSON object keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<Field, FieldValue>,
}

impl Record {
    pub fn insert(&mut self, field: Field, value: FieldValue) {
        self.fields.insert(field, value);
    }

    #[must_use]
    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    #[must_use]
    pub fn text(&self, field: Field) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_text)
    }

    #[must_use]
    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (*k, v))
    }

    /// Fills `calculated_discount` and `savings` from the two prices when no
    /// discount was found in the markup.
    ///
    /// Skipped when either price does not parse or the original price is not
    /// strictly greater than the current one.
    pub fn apply_derived_discount(&mut self) {
        if self.contains(Field::DiscountPercent) {
            return;
        }
        let (Some(price), Some(original)) =
            (self.text(Field::Price), self.text(Field::OriginalPrice))
        else {
            return;
        };
        let (Some(price), Some(original)) = (parse_amount(price), parse_amount(original)) else {
            return;
        };
        if let Some((discount, savings)) = compute_discount(price, original) {
            self.insert(Field::CalculatedDiscount, FieldValue::Text(discount));
            self.insert(Field::Savings, FieldValue::Text(savings));
        }
    }

    /// Applies derived fields and rejects records with nothing in them.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Empty`] when no field was populated.
    pub fn finish(mut self) -> Result<Self, RecordError> {
        if self.is_empty() {
            return Err(RecordError::Empty);
        }
        self.apply_derived_discount();
        Ok(self)
    }
}

/// Parses a price label that is a single amount: `"₹1,299.00"` → `1299.0`.
///
/// A leading currency symbol and thousands separators are allowed; any other
/// text (`"Up to 40% off ₹999"`) makes the label non-numeric.
#[must_use]
pub fn parse_amount(text: &str) -> Option<f64> {
    let digits = AMOUNT_RE.captures(text.trim())?.get(1)?.as_str().replace(',', "");
    digits
        .trim_end_matches('.')
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Discount percentage and absolute savings, both rounded to integers with
/// ties to even.
///
/// Returns `None` unless `original > price`, which also rules out a zero
/// denominator.
#[must_use]
pub fn compute_discount(price: f64, original: f64) -> Option<(String, String)> {
    if original <= price || original <= 0.0 {
        return None;
    }
    let diff = (original - price).round_ties_even();
    let percent = ((original - price) / original * 100.0).round_ties_even();
    Some((format!("{percent:.0}%"), format!("{diff:.0}")))
}
