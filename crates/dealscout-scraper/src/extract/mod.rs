//! Turning fetched HTML into deal records.
//!
//! Selectors live as data in [`schema`]; the machinery here walks them.

pub mod check;
pub mod field;
pub mod locator;
pub mod page;
pub mod record;
pub mod schema;

pub use check::Check;
pub use field::{extract_field, FieldSpec};
pub use locator::{Extraction, Located, Locator, LocatorChain};
pub use page::{Discovery, ExtractionLimits, FallbackScan, PageExtraction, PageExtractor};
pub use record::{compute_discount, parse_amount, Field, FieldValue, Record, RecordError};
