//! [`ObservationStore`] backed by the Postgres query modules.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use priceradar_core::{
    DiscountRecord, NewDiscount, NewObservation, ObservationRecord, ProductRecord, StoreRecord,
};
use priceradar_engine::{ObservationStore, StoreError};
use sqlx::PgPool;

use crate::{discounts, observations, products, stores, DbError};

const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Production storage: a thin adapter from the engine's storage contract to
/// the pooled Postgres queries.
#[derive(Clone)]
pub struct PgObservationStore {
    pool: PgPool,
}

impl PgObservationStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_error(err: DbError) -> StoreError {
    match err {
        DbError::Decode(detail) => StoreError::Corrupt(detail),
        other => StoreError::Backend(Box::new(other)),
    }
}

/// Like [`store_error`], but recognizes a store foreign-key violation and
/// reports it as [`StoreError::UnknownStore`] so the engine can turn it into
/// a not-found rather than a storage failure.
fn write_error(err: DbError, store_id: Option<i64>) -> StoreError {
    if let Some(store_id) = store_id {
        if let DbError::Sqlx(sqlx::Error::Database(db)) = &err {
            if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION)
                && db.constraint().is_some_and(|c| c.ends_with("store_id_fkey"))
            {
                return StoreError::UnknownStore(store_id);
            }
        }
    }
    store_error(err)
}

#[async_trait]
impl ObservationStore for PgObservationStore {
    async fn find_active_observations(
        &self,
        barcode: &str,
        barcode_type: &str,
    ) -> Result<Vec<ObservationRecord>, StoreError> {
        observations::find_active_observations(&self.pool, barcode, barcode_type)
            .await
            .map_err(store_error)
    }

    async fn find_store(&self, store_id: i64) -> Result<Option<StoreRecord>, StoreError> {
        stores::get_store(&self.pool, store_id)
            .await
            .map_err(store_error)
    }

    async fn upsert_product(
        &self,
        barcode: &str,
        barcode_type: &str,
        name: Option<&str>,
    ) -> Result<ProductRecord, StoreError> {
        products::upsert_product(&self.pool, barcode, barcode_type, name)
            .await
            .map_err(store_error)
    }

    async fn create_observation(
        &self,
        observation: NewObservation,
    ) -> Result<ObservationRecord, StoreError> {
        let store_id = observation.store_id;
        observations::insert_observation(&self.pool, &observation)
            .await
            .map_err(|err| write_error(err, store_id))
    }

    async fn find_active_discounts(
        &self,
        store_ids: &[i64],
        now: DateTime<Utc>,
    ) -> Result<Vec<DiscountRecord>, StoreError> {
        discounts::find_active_discounts(&self.pool, store_ids, now)
            .await
            .map_err(store_error)
    }

    async fn create_discount(&self, discount: NewDiscount) -> Result<DiscountRecord, StoreError> {
        let store_id = discount.store_id;
        discounts::insert_discount(&self.pool, &discount)
            .await
            .map_err(|err| write_error(err, Some(store_id)))
    }
}
