//! Nearby price comparison and observation ingest.
//!
//! [`NearbyPriceEngine`] answers "what does this product cost around me":
//! it pulls candidate observations from an [`ObservationStore`], filters by
//! distance, attaches active discounts, labels each price by rank, and
//! returns a deterministically sorted comparison. [`ObservationIngest`]
//! validates and records single or batched submissions, attributing source
//! and confidence from the caller-supplied [`Submitter`] identity.
//!
//! Storage is a trait so the engine runs against Postgres in production and
//! [`MemoryStore`] in tests.

pub mod discounts;
pub mod error;
pub mod ingest;
pub mod memory;
pub mod nearby;
pub mod store;

pub use discounts::DiscountResolver;
pub use error::{EngineError, StoreError};
pub use ingest::{
    BatchItemError, BatchOutcome, DiscountSubmission, ObservationIngest, ObservationSubmission,
    SubmissionReceipt,
};
pub use memory::MemoryStore;
pub use nearby::{
    DiscountInfo, GeoPoint, NearbyPrice, NearbyPriceEngine, NearbyPrices, NearbyQuery,
    PriceSummary, SearchArea,
};
pub use store::ObservationStore;

pub use priceradar_core::Submitter;
