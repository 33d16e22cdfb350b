//! Apply the validated YAML seed dataset to the database.

use std::collections::HashMap;

use priceradar_core::{SeedFile, Submitter};
use sqlx::PgPool;

use crate::DbError;

/// What a seed run touched. Stores and products count upserts; observations
/// and discounts count actual inserts, since re-running the seed skips rows
/// that already exist.
#[derive(Debug, Clone, Copy)]
pub struct SeedSummary {
    pub stores: usize,
    pub products: usize,
    pub observations: usize,
    pub discounts: usize,
}

/// Apply a seed dataset inside a single transaction; any failure rolls the
/// whole batch back. The seed is expected to have passed
/// [`priceradar_core::load_seed`] validation; internally inconsistent data
/// surfaces as [`DbError::Seed`].
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails, or
/// [`DbError::Seed`] for dangling references inside the dataset.
pub async fn apply_seed(
    pool: &PgPool,
    seed: &SeedFile,
    default_currency: &str,
) -> Result<SeedSummary, DbError> {
    let mut tx = pool.begin().await?;

    let mut store_entries: HashMap<String, (i64, f64, f64)> = HashMap::new();
    for store in &seed.stores {
        let (id, latitude, longitude) = sqlx::query_as::<_, (i64, f64, f64)>(
            "INSERT INTO stores (name, status, latitude, longitude, contact_email) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (name) DO UPDATE SET \
                 status        = EXCLUDED.status, \
                 latitude      = EXCLUDED.latitude, \
                 longitude     = EXCLUDED.longitude, \
                 contact_email = EXCLUDED.contact_email, \
                 updated_at    = NOW() \
             RETURNING id, latitude, longitude",
        )
        .bind(&store.name)
        .bind(store.status.as_str())
        .bind(store.latitude)
        .bind(store.longitude)
        .bind(&store.contact_email)
        .fetch_one(&mut *tx)
        .await?;

        store_entries.insert(store.name.to_lowercase(), (id, latitude, longitude));
    }

    let mut product_ids: HashMap<(String, String), i64> = HashMap::new();
    for product in &seed.products {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO products (barcode, barcode_type, name) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (barcode, barcode_type) DO UPDATE SET \
                 name       = COALESCE(EXCLUDED.name, products.name), \
                 updated_at = NOW() \
             RETURNING id",
        )
        .bind(&product.barcode)
        .bind(&product.barcode_type)
        .bind(&product.name)
        .fetch_one(&mut *tx)
        .await?;

        product_ids.insert((product.barcode.clone(), product.barcode_type.clone()), id);
    }

    let mut observations = 0usize;
    for obs in &seed.observations {
        let product_id = product_ids
            .get(&(obs.barcode.clone(), obs.barcode_type.clone()))
            .copied()
            .ok_or_else(|| {
                DbError::Seed(format!(
                    "observation references undeclared product ({}, {})",
                    obs.barcode, obs.barcode_type
                ))
            })?;

        let store_entry = match &obs.store {
            Some(name) => Some(
                store_entries
                    .get(&name.to_lowercase())
                    .copied()
                    .ok_or_else(|| {
                        DbError::Seed(format!("observation references unknown store '{name}'"))
                    })?,
            ),
            None => None,
        };

        let (latitude, longitude) = match (obs.latitude, obs.longitude, store_entry) {
            (Some(lat), Some(lon), _) => (lat, lon),
            (_, _, Some((_, lat, lon))) => (lat, lon),
            _ => {
                return Err(DbError::Seed(format!(
                    "anonymous observation for ({}, {}) has no coordinates",
                    obs.barcode, obs.barcode_type
                )))
            }
        };

        let store_id = store_entry.map(|(id, _, _)| id);
        let submitter = match store_id {
            Some(store_id) => Submitter::Store { store_id },
            None => Submitter::Anonymous,
        };
        let currency = obs.currency.as_deref().unwrap_or(default_currency);

        let rows_affected = sqlx::query(
            "INSERT INTO price_observations \
                 (product_id, store_id, amount, currency, latitude, longitude, \
                  source, confidence, observed_at) \
             SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9 \
             WHERE NOT EXISTS ( \
                 SELECT 1 FROM price_observations \
                 WHERE product_id = $1 \
                   AND store_id IS NOT DISTINCT FROM $2 \
                   AND amount = $3 \
                   AND observed_at = $9 \
             )",
        )
        .bind(product_id)
        .bind(store_id)
        .bind(obs.amount)
        .bind(currency)
        .bind(latitude)
        .bind(longitude)
        .bind(submitter.source().as_str())
        .bind(submitter.confidence())
        .bind(obs.observed_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        observations += usize::try_from(rows_affected).unwrap_or(0);
    }

    let mut discounts = 0usize;
    for discount in &seed.discounts {
        let (store_id, _, _) = store_entries
            .get(&discount.store.to_lowercase())
            .copied()
            .ok_or_else(|| {
                DbError::Seed(format!(
                    "discount references unknown store '{}'",
                    discount.store
                ))
            })?;

        let product_id = match (&discount.barcode, &discount.barcode_type) {
            (Some(barcode), Some(barcode_type)) => Some(
                product_ids
                    .get(&(barcode.clone(), barcode_type.clone()))
                    .copied()
                    .ok_or_else(|| {
                        DbError::Seed(format!(
                            "discount references undeclared product ({barcode}, {barcode_type})"
                        ))
                    })?,
            ),
            _ => None,
        };

        let rows_affected = sqlx::query(
            "INSERT INTO discounts \
                 (store_id, product_id, kind, value, description, valid_from, valid_until) \
             SELECT $1, $2, $3, $4, $5, $6, $7 \
             WHERE NOT EXISTS ( \
                 SELECT 1 FROM discounts \
                 WHERE store_id = $1 \
                   AND product_id IS NOT DISTINCT FROM $2 \
                   AND kind = $3 \
                   AND value = $4 \
                   AND valid_from = $6 \
                   AND valid_until = $7 \
             )",
        )
        .bind(store_id)
        .bind(product_id)
        .bind(discount.kind.as_str())
        .bind(discount.value)
        .bind(&discount.description)
        .bind(discount.valid_from)
        .bind(discount.valid_until)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        discounts += usize::try_from(rows_affected).unwrap_or(0);
    }

    tx.commit().await?;

    Ok(SeedSummary {
        stores: seed.stores.len(),
        products: seed.products.len(),
        observations,
        discounts,
    })
}
