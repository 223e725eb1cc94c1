pub mod error;
pub mod extract;
pub mod fetch;
pub mod identity;
pub mod orchestrator;

pub use error::ScraperError;
pub use extract::{
    Field, FieldValue, PageExtraction, PageExtractor, Record, RecordError,
};
pub use fetch::{BackoffPolicy, FailureReason, FetchResult, FetcherConfig, ResilientFetcher};
pub use identity::{AttemptStrategy, Identity, RequestIdentityProvider};
pub use orchestrator::{
    ConcurrencyLimits, ExtractionOrchestrator, PageExtractionResult, PageOutcome,
};
