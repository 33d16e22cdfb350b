use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use priceradar_core::DiscountRecord;

use crate::error::StoreError;
use crate::store::ObservationStore;

/// Looks up the discounts in force at a given instant for a set of stores.
///
/// Storage returns candidates in no particular order; the resolver owns the
/// presentation order, which is highest value first so the steepest offer
/// leads when a store runs several at once.
pub struct DiscountResolver {
    store: Arc<dyn ObservationStore>,
}

impl DiscountResolver {
    #[must_use]
    pub fn new(store: Arc<dyn ObservationStore>) -> Self {
        Self { store }
    }

    /// Active discounts grouped by store id, each group sorted by value
    /// descending (ties broken by id ascending for a stable order).
    ///
    /// Stores without any active discount are absent from the map.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backing store fails.
    pub async fn active_for_stores(
        &self,
        store_ids: &[i64],
        now: DateTime<Utc>,
    ) -> Result<HashMap<i64, Vec<DiscountRecord>>, StoreError> {
        if store_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = self.store.find_active_discounts(store_ids, now).await?;
        let mut by_store: HashMap<i64, Vec<DiscountRecord>> = HashMap::new();
        for row in rows {
            by_store.entry(row.store_id).or_default().push(row);
        }
        for group in by_store.values_mut() {
            group.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.id.cmp(&b.id)));
        }
        Ok(by_store)
    }
}
