//! Database operations for the `stores` table.

use chrono::{DateTime, Utc};
use priceradar_core::{StoreRecord, StoreStatus};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `stores` table. `status` stays textual until conversion,
/// where an unknown value surfaces as [`DbError::Decode`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoreRow {
    pub id: i64,
    pub name: String,
    pub status: String,
    pub latitude: f64,
    pub longitude: f64,
    pub contact_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoreRow {
    /// Convert into the core record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] for a status value outside the schema's
    /// CHECK list.
    pub fn into_record(self) -> Result<StoreRecord, DbError> {
        let status = StoreStatus::parse(&self.status)
            .ok_or_else(|| DbError::Decode(format!("unknown store status '{}'", self.status)))?;
        Ok(StoreRecord {
            id: self.id,
            name: self.name,
            status,
            latitude: self.latitude,
            longitude: self.longitude,
            contact_email: self.contact_email,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Fetches a store by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::Decode`] for
/// an unrecognized stored status.
pub async fn get_store(pool: &PgPool, store_id: i64) -> Result<Option<StoreRecord>, DbError> {
    let row = sqlx::query_as::<_, StoreRow>(
        "SELECT id, name, status, latitude, longitude, contact_email, \
                created_at, updated_at \
         FROM stores \
         WHERE id = $1",
    )
    .bind(store_id)
    .fetch_optional(pool)
    .await?;

    row.map(StoreRow::into_record).transpose()
}

/// Fetches a store by its unique display name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::Decode`] for
/// an unrecognized stored status.
pub async fn get_store_by_name(pool: &PgPool, name: &str) -> Result<Option<StoreRecord>, DbError> {
    let row = sqlx::query_as::<_, StoreRow>(
        "SELECT id, name, status, latitude, longitude, contact_email, \
                created_at, updated_at \
         FROM stores \
         WHERE name = $1",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;

    row.map(StoreRow::into_record).transpose()
}

/// Upserts a store keyed by name. Used by the seed workflow; the service
/// itself never creates store accounts.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails, or [`DbError::Decode`] for
/// an unrecognized stored status.
pub async fn upsert_store(
    pool: &PgPool,
    name: &str,
    status: StoreStatus,
    latitude: f64,
    longitude: f64,
    contact_email: Option<&str>,
) -> Result<StoreRecord, DbError> {
    let row = sqlx::query_as::<_, StoreRow>(
        "INSERT INTO stores (name, status, latitude, longitude, contact_email) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (name) DO UPDATE SET \
             status        = EXCLUDED.status, \
             latitude      = EXCLUDED.latitude, \
             longitude     = EXCLUDED.longitude, \
             contact_email = EXCLUDED.contact_email, \
             updated_at    = NOW() \
         RETURNING id, name, status, latitude, longitude, contact_email, \
                   created_at, updated_at",
    )
    .bind(name)
    .bind(status.as_str())
    .bind(latitude)
    .bind(longitude)
    .bind(contact_email)
    .fetch_one(pool)
    .await?;

    row.into_record()
}
