use async_trait::async_trait;
use chrono::{DateTime, Utc};
use priceradar_core::{
    DiscountRecord, NewDiscount, NewObservation, ObservationRecord, ProductRecord, StoreRecord,
};

use crate::error::StoreError;

/// Persistence collaborator for products, stores, observations and discounts.
///
/// The engine is written against this trait; `priceradar-db` provides the
/// Postgres implementation and [`crate::MemoryStore`] the in-memory one used
/// in tests and demos.
#[async_trait]
pub trait ObservationStore: Send + Sync {
    /// Active observations for a product, with the owning store's display
    /// name joined in. Rows are restricted to stores in the ACTIVE lifecycle
    /// state; anonymous rows (no store) always qualify. Order is unspecified.
    async fn find_active_observations(
        &self,
        barcode: &str,
        barcode_type: &str,
    ) -> Result<Vec<ObservationRecord>, StoreError>;

    async fn find_store(&self, store_id: i64) -> Result<Option<StoreRecord>, StoreError>;

    /// Resolve or create the product for a (barcode, barcode_type) pair.
    ///
    /// A provided name overwrites the stored one; an absent name leaves it
    /// untouched.
    async fn upsert_product(
        &self,
        barcode: &str,
        barcode_type: &str,
        name: Option<&str>,
    ) -> Result<ProductRecord, StoreError>;

    async fn create_observation(
        &self,
        observation: NewObservation,
    ) -> Result<ObservationRecord, StoreError>;

    /// Discounts valid at `now` (active flag set, window containing `now`)
    /// for any of the given stores. Order is unspecified; the resolver owns
    /// presentation ordering.
    async fn find_active_discounts(
        &self,
        store_ids: &[i64],
        now: DateTime<Utc>,
    ) -> Result<Vec<DiscountRecord>, StoreError>;

    /// Persist a discount. Fails with [`StoreError::UnknownStore`] when the
    /// referenced store does not exist.
    async fn create_discount(&self, discount: NewDiscount) -> Result<DiscountRecord, StoreError>;
}
