//! Nearby price comparison.
//!
//! Pulls every active observation for a product, keeps the ones inside the
//! search radius, labels each price against the whole result set, and
//! attaches the discounts currently running at the reporting stores.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use priceradar_core::geo::{bounding_box, distance_km};
use priceradar_core::label::price_label;
use priceradar_core::{
    BoundingBox, DiscountKind, DiscountRecord, ObservationRecord, PriceLabel, PriceSource,
};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::discounts::DiscountResolver;
use crate::error::{validate_point, EngineError};
use crate::store::ObservationStore;

/// A nearby-prices lookup as received from the caller.
#[derive(Debug, Clone)]
pub struct NearbyQuery {
    pub barcode: String,
    pub barcode_type: String,
    pub latitude: f64,
    pub longitude: f64,
    /// `None` means "use the configured default radius".
    pub radius_km: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// The area that was actually searched, after defaulting and clamping the
/// requested radius.
#[derive(Debug, Clone, Serialize)]
pub struct SearchArea {
    pub center: GeoPoint,
    pub radius_km: f64,
    pub bounds: BoundingBox,
}

/// Discount as presented alongside a price, without storage bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct DiscountInfo {
    pub kind: DiscountKind,
    pub value: Decimal,
    pub description: Option<String>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

impl From<&DiscountRecord> for DiscountInfo {
    fn from(record: &DiscountRecord) -> Self {
        Self {
            kind: record.kind,
            value: record.value,
            description: record.description.clone(),
            valid_from: record.valid_from,
            valid_until: record.valid_until,
        }
    }
}

/// One priced sighting of the product inside the search area.
#[derive(Debug, Clone, Serialize)]
pub struct NearbyPrice {
    pub observation_id: Uuid,
    pub store_id: Option<i64>,
    pub store_name: Option<String>,
    pub location: GeoPoint,
    pub distance_km: f64,
    pub price: Decimal,
    pub currency: String,
    pub label: PriceLabel,
    pub source: PriceSource,
    pub observed_at: DateTime<Utc>,
    pub discounts: Vec<DiscountInfo>,
}

/// Price spread over the whole result set. `min_price` and `max_price` are
/// `None` exactly when `count` is zero.
#[derive(Debug, Clone, Serialize)]
pub struct PriceSummary {
    pub count: usize,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

/// Result of a nearby-prices lookup. An empty area is a normal outcome,
/// reported with a message rather than an error.
#[derive(Debug, Clone, Serialize)]
pub struct NearbyPrices {
    pub results: Vec<NearbyPrice>,
    pub summary: PriceSummary,
    pub search_area: SearchArea,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Answers "what does this product cost around me".
pub struct NearbyPriceEngine {
    store: Arc<dyn ObservationStore>,
    resolver: DiscountResolver,
    default_radius_km: f64,
    max_radius_km: f64,
}

impl NearbyPriceEngine {
    #[must_use]
    pub fn new(store: Arc<dyn ObservationStore>, default_radius_km: f64, max_radius_km: f64) -> Self {
        let resolver = DiscountResolver::new(Arc::clone(&store));
        Self {
            store,
            resolver,
            default_radius_km,
            max_radius_km,
        }
    }

    /// Find, label, and sort the active prices for a product around a point.
    ///
    /// Results are ordered by price ascending, then distance ascending, then
    /// observation time descending, so reruns over the same data always
    /// paginate identically. Labels are relative to every price in this
    /// result set; discounts do not change the labeled price.
    ///
    /// # Errors
    ///
    /// [`EngineError::Validation`] for an empty barcode or barcode type, out
    /// of range coordinates, or a non-positive radius. [`EngineError::Storage`]
    /// when the backing store fails.
    pub async fn find_nearby(
        &self,
        query: &NearbyQuery,
        now: DateTime<Utc>,
    ) -> Result<NearbyPrices, EngineError> {
        let barcode = query.barcode.trim();
        if barcode.is_empty() {
            return Err(EngineError::validation("barcode", "barcode is required"));
        }
        let barcode_type = query.barcode_type.trim();
        if barcode_type.is_empty() {
            return Err(EngineError::validation(
                "barcode_type",
                "barcode type is required",
            ));
        }
        validate_point(query.latitude, query.longitude)?;
        let radius_km = self.effective_radius(query.radius_km)?;

        let search_area = SearchArea {
            center: GeoPoint {
                latitude: query.latitude,
                longitude: query.longitude,
            },
            radius_km,
            bounds: bounding_box(query.latitude, query.longitude, radius_km),
        };

        let candidates = self
            .store
            .find_active_observations(barcode, barcode_type)
            .await?;

        let mut hits: Vec<(ObservationRecord, f64)> = candidates
            .into_iter()
            .filter_map(|obs| {
                let distance = distance_km(
                    query.latitude,
                    query.longitude,
                    obs.latitude,
                    obs.longitude,
                );
                (distance <= radius_km).then_some((obs, distance))
            })
            .collect();

        if hits.is_empty() {
            return Ok(NearbyPrices {
                results: Vec::new(),
                summary: PriceSummary {
                    count: 0,
                    min_price: None,
                    max_price: None,
                },
                search_area,
                message: Some("No prices found for this product in the search area".to_string()),
            });
        }

        let mut store_ids: Vec<i64> = hits.iter().filter_map(|(obs, _)| obs.store_id).collect();
        store_ids.sort_unstable();
        store_ids.dedup();

        let product_id = hits[0].0.product_id;
        let mut discounts = self.resolver.active_for_stores(&store_ids, now).await?;
        for group in discounts.values_mut() {
            group.retain(|d| d.product_id.is_none() || d.product_id == Some(product_id));
        }

        let prices: Vec<Decimal> = hits.iter().map(|(obs, _)| obs.amount).collect();
        let min_price = prices.iter().min().copied();
        let max_price = prices.iter().max().copied();

        hits.sort_by(|(a, da), (b, db)| {
            a.amount
                .cmp(&b.amount)
                .then_with(|| da.total_cmp(db))
                .then_with(|| b.observed_at.cmp(&a.observed_at))
        });

        let results: Vec<NearbyPrice> = hits
            .into_iter()
            .map(|(obs, distance)| {
                let attached = obs
                    .store_id
                    .and_then(|id| discounts.get(&id))
                    .map(|group| group.iter().map(DiscountInfo::from).collect())
                    .unwrap_or_default();
                NearbyPrice {
                    observation_id: obs.public_id,
                    store_id: obs.store_id,
                    store_name: obs.store_name,
                    location: GeoPoint {
                        latitude: obs.latitude,
                        longitude: obs.longitude,
                    },
                    distance_km: distance,
                    price: obs.amount,
                    currency: obs.currency,
                    label: price_label(obs.amount, &prices),
                    source: obs.source,
                    observed_at: obs.observed_at,
                    discounts: attached,
                }
            })
            .collect();

        let summary = PriceSummary {
            count: results.len(),
            min_price,
            max_price,
        };

        Ok(NearbyPrices {
            results,
            summary,
            search_area,
            message: None,
        })
    }

    /// Apply the default when no radius was given, reject non-positive
    /// values, and clamp to the configured maximum.
    fn effective_radius(&self, requested: Option<f64>) -> Result<f64, EngineError> {
        match requested {
            None => Ok(self.default_radius_km),
            Some(radius) => {
                if !radius.is_finite() || radius <= 0.0 {
                    return Err(EngineError::validation(
                        "radius_km",
                        "radius must be a positive number of kilometers",
                    ));
                }
                Ok(radius.min(self.max_radius_km))
            }
        }
    }
}
