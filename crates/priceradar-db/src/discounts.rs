//! Database operations for the `discounts` table.

use chrono::{DateTime, Utc};
use priceradar_core::{DiscountKind, DiscountRecord, NewDiscount};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `discounts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DiscountRow {
    pub id: i64,
    pub store_id: i64,
    pub product_id: Option<i64>,
    pub kind: String,
    pub value: Decimal,
    pub description: Option<String>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl DiscountRow {
    /// Convert into the core record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] for a kind value outside the schema's
    /// CHECK list.
    pub fn into_record(self) -> Result<DiscountRecord, DbError> {
        let kind = DiscountKind::parse(&self.kind)
            .ok_or_else(|| DbError::Decode(format!("unknown discount kind '{}'", self.kind)))?;
        Ok(DiscountRecord {
            id: self.id,
            store_id: self.store_id,
            product_id: self.product_id,
            kind,
            value: self.value,
            description: self.description,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            is_active: self.is_active,
            created_at: self.created_at,
        })
    }
}

/// Inserts a discount row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including a foreign-key
/// violation for an unknown store).
pub async fn insert_discount(
    pool: &PgPool,
    discount: &NewDiscount,
) -> Result<DiscountRecord, DbError> {
    let row = sqlx::query_as::<_, DiscountRow>(
        "INSERT INTO discounts \
             (store_id, product_id, kind, value, description, valid_from, valid_until) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING id, store_id, product_id, kind, value, description, \
                   valid_from, valid_until, is_active, created_at",
    )
    .bind(discount.store_id)
    .bind(discount.product_id)
    .bind(discount.kind.as_str())
    .bind(discount.value)
    .bind(&discount.description)
    .bind(discount.valid_from)
    .bind(discount.valid_until)
    .fetch_one(pool)
    .await?;

    row.into_record()
}

/// All discounts in force at `now` for the given stores. Ordering is left to
/// the caller.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::Decode`] for
/// an unrecognized stored kind.
pub async fn find_active_discounts(
    pool: &PgPool,
    store_ids: &[i64],
    now: DateTime<Utc>,
) -> Result<Vec<DiscountRecord>, DbError> {
    let rows = sqlx::query_as::<_, DiscountRow>(
        "SELECT id, store_id, product_id, kind, value, description, \
                valid_from, valid_until, is_active, created_at \
         FROM discounts \
         WHERE store_id = ANY($1) \
           AND is_active \
           AND valid_from <= $2 \
           AND valid_until >= $2",
    )
    .bind(store_ids)
    .bind(now)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(DiscountRow::into_record).collect()
}
