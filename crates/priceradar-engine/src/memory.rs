use async_trait::async_trait;
use chrono::{DateTime, Utc};
use priceradar_core::{
    DiscountRecord, NewDiscount, NewObservation, ObservationRecord, ProductRecord, StoreRecord,
    StoreStatus,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::ObservationStore;

#[derive(Default)]
struct Inner {
    products: Vec<ProductRecord>,
    stores: Vec<StoreRecord>,
    observations: Vec<ObservationRecord>,
    discounts: Vec<DiscountRecord>,
    next_id: i64,
}

impl Inner {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory [`ObservationStore`] backed by `tokio::sync::RwLock`.
///
/// Reference implementation of the storage contract; used throughout the
/// engine and server tests and by demo setups that run without Postgres.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a store account. Test and demo setup helper; store accounts
    /// have no creation path through the engine itself.
    pub async fn add_store(
        &self,
        name: &str,
        status: StoreStatus,
        latitude: f64,
        longitude: f64,
    ) -> StoreRecord {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let record = StoreRecord {
            id: inner.allocate_id(),
            name: name.to_string(),
            status,
            latitude,
            longitude,
            contact_email: None,
            created_at: now,
            updated_at: now,
        };
        inner.stores.push(record.clone());
        record
    }

    /// Soft-delete an observation by its public id. Returns whether a row
    /// was marked.
    pub async fn deactivate_observation(&self, public_id: Uuid) -> bool {
        let mut inner = self.inner.write().await;
        match inner
            .observations
            .iter_mut()
            .find(|obs| obs.public_id == public_id)
        {
            Some(obs) => {
                obs.is_active = false;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl ObservationStore for MemoryStore {
    async fn find_active_observations(
        &self,
        barcode: &str,
        barcode_type: &str,
    ) -> Result<Vec<ObservationRecord>, StoreError> {
        let inner = self.inner.read().await;
        let Some(product_id) = inner
            .products
            .iter()
            .find(|p| p.barcode == barcode && p.barcode_type == barcode_type)
            .map(|p| p.id)
        else {
            return Ok(Vec::new());
        };

        let rows = inner
            .observations
            .iter()
            .filter(|obs| obs.product_id == product_id && obs.is_active)
            .filter_map(|obs| match obs.store_id {
                None => Some(obs.clone()),
                Some(store_id) => {
                    let store = inner.stores.iter().find(|s| s.id == store_id)?;
                    (store.status == StoreStatus::Active).then(|| {
                        let mut row = obs.clone();
                        row.store_name = Some(store.name.clone());
                        row
                    })
                }
            })
            .collect();
        Ok(rows)
    }

    async fn find_store(&self, store_id: i64) -> Result<Option<StoreRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.stores.iter().find(|s| s.id == store_id).cloned())
    }

    async fn upsert_product(
        &self,
        barcode: &str,
        barcode_type: &str,
        name: Option<&str>,
    ) -> Result<ProductRecord, StoreError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        if let Some(existing) = inner
            .products
            .iter_mut()
            .find(|p| p.barcode == barcode && p.barcode_type == barcode_type)
        {
            if let Some(name) = name {
                existing.name = Some(name.to_string());
                existing.updated_at = now;
            }
            return Ok(existing.clone());
        }

        let record = ProductRecord {
            id: inner.allocate_id(),
            barcode: barcode.to_string(),
            barcode_type: barcode_type.to_string(),
            name: name.map(ToString::to_string),
            created_at: now,
            updated_at: now,
        };
        inner.products.push(record.clone());
        Ok(record)
    }

    async fn create_observation(
        &self,
        observation: NewObservation,
    ) -> Result<ObservationRecord, StoreError> {
        let mut inner = self.inner.write().await;
        let store_name = match observation.store_id {
            Some(store_id) => Some(
                inner
                    .stores
                    .iter()
                    .find(|s| s.id == store_id)
                    .ok_or(StoreError::UnknownStore(store_id))?
                    .name
                    .clone(),
            ),
            None => None,
        };

        let record = ObservationRecord {
            id: inner.allocate_id(),
            public_id: Uuid::new_v4(),
            product_id: observation.product_id,
            store_id: observation.store_id,
            store_name,
            amount: observation.amount,
            currency: observation.currency,
            latitude: observation.latitude,
            longitude: observation.longitude,
            source: observation.source,
            confidence: observation.confidence,
            observed_at: observation.observed_at,
            is_active: true,
            created_at: Utc::now(),
        };
        inner.observations.push(record.clone());
        Ok(record)
    }

    async fn find_active_discounts(
        &self,
        store_ids: &[i64],
        now: DateTime<Utc>,
    ) -> Result<Vec<DiscountRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .discounts
            .iter()
            .filter(|d| {
                store_ids.contains(&d.store_id)
                    && d.is_active
                    && d.valid_from <= now
                    && now <= d.valid_until
            })
            .cloned()
            .collect())
    }

    async fn create_discount(&self, discount: NewDiscount) -> Result<DiscountRecord, StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.stores.iter().any(|s| s.id == discount.store_id) {
            return Err(StoreError::UnknownStore(discount.store_id));
        }

        let record = DiscountRecord {
            id: inner.allocate_id(),
            store_id: discount.store_id,
            product_id: discount.product_id,
            kind: discount.kind,
            value: discount.value,
            description: discount.description,
            valid_from: discount.valid_from,
            valid_until: discount.valid_until,
            is_active: true,
            created_at: Utc::now(),
        };
        inner.discounts.push(record.clone());
        Ok(record)
    }
}
