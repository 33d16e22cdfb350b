//! Database operations for the `products` catalog.

use chrono::{DateTime, Utc};
use priceradar_core::ProductRecord;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub barcode: String,
    pub barcode_type: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for ProductRecord {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            barcode: row.barcode,
            barcode_type: row.barcode_type,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Upserts a product row keyed by `(barcode, barcode_type)`.
///
/// A provided `name` overwrites the stored one; an absent `name` leaves the
/// stored value untouched (`COALESCE` against the existing row).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_product(
    pool: &PgPool,
    barcode: &str,
    barcode_type: &str,
    name: Option<&str>,
) -> Result<ProductRecord, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(
        "INSERT INTO products (barcode, barcode_type, name) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (barcode, barcode_type) DO UPDATE SET \
             name       = COALESCE(EXCLUDED.name, products.name), \
             updated_at = NOW() \
         RETURNING id, barcode, barcode_type, name, created_at, updated_at",
    )
    .bind(barcode)
    .bind(barcode_type)
    .bind(name)
    .fetch_one(pool)
    .await?;

    Ok(row.into())
}

/// Looks up a product by its barcode key.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product_by_barcode(
    pool: &PgPool,
    barcode: &str,
    barcode_type: &str,
) -> Result<Option<ProductRecord>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(
        "SELECT id, barcode, barcode_type, name, created_at, updated_at \
         FROM products \
         WHERE barcode = $1 AND barcode_type = $2",
    )
    .bind(barcode)
    .bind(barcode_type)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Into::into))
}
