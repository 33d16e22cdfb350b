//! Database operations for the `price_observations` table.

use chrono::{DateTime, Utc};
use priceradar_core::{NewObservation, ObservationRecord, PriceSource};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from `price_observations`, with the store name joined in.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ObservationRow {
    pub id: i64,
    pub public_id: Uuid,
    pub product_id: i64,
    pub store_id: Option<i64>,
    pub store_name: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub latitude: f64,
    pub longitude: f64,
    pub source: String,
    pub confidence: f64,
    pub observed_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl ObservationRow {
    /// Convert into the core record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] for a source value outside the schema's
    /// CHECK list.
    pub fn into_record(self) -> Result<ObservationRecord, DbError> {
        let source = PriceSource::parse(&self.source)
            .ok_or_else(|| DbError::Decode(format!("unknown price source '{}'", self.source)))?;
        Ok(ObservationRecord {
            id: self.id,
            public_id: self.public_id,
            product_id: self.product_id,
            store_id: self.store_id,
            store_name: self.store_name,
            amount: self.amount,
            currency: self.currency,
            latitude: self.latitude,
            longitude: self.longitude,
            source,
            confidence: self.confidence,
            observed_at: self.observed_at,
            is_active: self.is_active,
            created_at: self.created_at,
        })
    }
}

/// Inserts an observation and returns it with the store name joined, in a
/// single round-trip.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including a foreign-key
/// violation for an unknown store).
pub async fn insert_observation(
    pool: &PgPool,
    observation: &NewObservation,
) -> Result<ObservationRecord, DbError> {
    let row = sqlx::query_as::<_, ObservationRow>(
        "WITH inserted AS ( \
             INSERT INTO price_observations \
                 (product_id, store_id, amount, currency, latitude, longitude, \
                  source, confidence, observed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING * \
         ) \
         SELECT inserted.id, inserted.public_id, inserted.product_id, \
                inserted.store_id, s.name AS store_name, inserted.amount, \
                inserted.currency, inserted.latitude, inserted.longitude, \
                inserted.source, inserted.confidence, inserted.observed_at, \
                inserted.is_active, inserted.created_at \
         FROM inserted \
         LEFT JOIN stores s ON s.id = inserted.store_id",
    )
    .bind(observation.product_id)
    .bind(observation.store_id)
    .bind(observation.amount)
    .bind(&observation.currency)
    .bind(observation.latitude)
    .bind(observation.longitude)
    .bind(observation.source.as_str())
    .bind(observation.confidence)
    .bind(observation.observed_at)
    .fetch_one(pool)
    .await?;

    row.into_record()
}

/// All active observations for a product, excluding rows whose store account
/// is anything but ACTIVE. Anonymous rows (no store) always qualify.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::Decode`] for
/// an unrecognized stored source.
pub async fn find_active_observations(
    pool: &PgPool,
    barcode: &str,
    barcode_type: &str,
) -> Result<Vec<ObservationRecord>, DbError> {
    let rows = sqlx::query_as::<_, ObservationRow>(
        "SELECT o.id, o.public_id, o.product_id, o.store_id, \
                s.name AS store_name, o.amount, o.currency, o.latitude, \
                o.longitude, o.source, o.confidence, o.observed_at, \
                o.is_active, o.created_at \
         FROM price_observations o \
         JOIN products p ON p.id = o.product_id \
         LEFT JOIN stores s ON s.id = o.store_id \
         WHERE p.barcode = $1 \
           AND p.barcode_type = $2 \
           AND o.is_active \
           AND (o.store_id IS NULL OR s.status = 'ACTIVE') \
         ORDER BY o.observed_at DESC, o.id DESC",
    )
    .bind(barcode)
    .bind(barcode_type)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(ObservationRow::into_record).collect()
}

/// Soft-deletes an observation by its public id.
///
/// Returns `true` if an active row was retired, `false` if no active row
/// matched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn deactivate_observation(pool: &PgPool, public_id: Uuid) -> Result<bool, DbError> {
    let rows_affected = sqlx::query(
        "UPDATE price_observations \
         SET is_active = FALSE \
         WHERE public_id = $1 AND is_active",
    )
    .bind(public_id)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(rows_affected > 0)
}
