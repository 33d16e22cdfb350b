//! Observation ingest.
//!
//! Validates submissions, resolves store attribution from the caller's
//! [`Submitter`] identity, upserts the product catalog entry, and records
//! the observation (plus an optional attached discount). Batch submission
//! is all-items-attempted: one bad item never blocks the rest.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use priceradar_core::barcode::{self, BarcodeCheck};
use priceradar_core::{
    DiscountKind, DiscountRecord, NewDiscount, NewObservation, ObservationRecord, StoreStatus,
    Submitter,
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{validate_point, EngineError};
use crate::store::ObservationStore;

/// A single price submission as received from the caller.
#[derive(Debug, Clone)]
pub struct ObservationSubmission {
    pub barcode: String,
    pub barcode_type: String,
    pub amount: Decimal,
    pub latitude: f64,
    pub longitude: f64,
    pub product_name: Option<String>,
    /// Three-letter code; the configured default applies when absent.
    pub currency: Option<String>,
    /// When the price was seen. Absent means the time of submission.
    pub observed_at: Option<DateTime<Utc>>,
    /// Store submitters may state their own store id; anyone else must
    /// leave this unset.
    pub store_id: Option<i64>,
    pub discount: Option<DiscountSubmission>,
}

/// Discount attached to a submission, only honored for store submitters.
#[derive(Debug, Clone)]
pub struct DiscountSubmission {
    pub kind: DiscountKind,
    pub value: Decimal,
    pub description: Option<String>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

/// What a successful submission created.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub observation: ObservationRecord,
    pub discount: Option<DiscountRecord>,
}

/// One failed item of a batch, tied back to its input position.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItemError {
    pub index: usize,
    pub field: Option<&'static str>,
    pub message: String,
}

/// Per-item outcome of a batch submission.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub processed: usize,
    pub failed: usize,
    pub errors: Vec<BatchItemError>,
    pub observations: Vec<ObservationRecord>,
}

/// Validates and records price submissions.
pub struct ObservationIngest {
    store: Arc<dyn ObservationStore>,
    default_currency: String,
    max_batch_size: usize,
}

impl ObservationIngest {
    pub fn new(
        store: Arc<dyn ObservationStore>,
        default_currency: impl Into<String>,
        max_batch_size: usize,
    ) -> Self {
        Self {
            store,
            default_currency: default_currency.into(),
            max_batch_size,
        }
    }

    /// Record one observation on behalf of `submitter`.
    ///
    /// Source and confidence are derived from the submitter identity, never
    /// from the payload. A store submitter is pinned to its own store; a
    /// `store_id` stated by anyone else is ignored. An attached discount is
    /// validated up front but written after the observation, and a storage
    /// failure at that point is logged rather than failing the submission.
    ///
    /// # Errors
    ///
    /// [`EngineError::Validation`] for malformed fields,
    /// [`EngineError::Forbidden`] for store mismatches, locked or rejected
    /// store accounts, and discounts without store identity,
    /// [`EngineError::NotFound`] for missing or deleted stores, and
    /// [`EngineError::Storage`] when the backing store fails.
    pub async fn submit(
        &self,
        submission: &ObservationSubmission,
        submitter: Submitter,
        now: DateTime<Utc>,
    ) -> Result<SubmissionReceipt, EngineError> {
        let barcode = submission.barcode.trim();
        if barcode.is_empty() {
            return Err(EngineError::validation("barcode", "barcode is required"));
        }
        let barcode_type = submission.barcode_type.trim();
        if barcode_type.is_empty() {
            return Err(EngineError::validation(
                "barcode_type",
                "barcode type is required",
            ));
        }
        if submission.amount <= Decimal::ZERO {
            return Err(EngineError::validation(
                "amount",
                "amount must be a positive price",
            ));
        }
        validate_point(submission.latitude, submission.longitude)?;
        let currency = self.resolve_currency(submission.currency.as_deref())?;

        let effective_store = match submitter {
            Submitter::Store { store_id } => {
                if submission.store_id.is_some_and(|requested| requested != store_id) {
                    return Err(EngineError::forbidden(
                        "store accounts can only submit prices for their own store",
                    ));
                }
                Some(store_id)
            }
            Submitter::Anonymous | Submitter::Admin => {
                if submission.store_id.is_some() {
                    tracing::debug!("ignoring store_id on a submission without store identity");
                }
                None
            }
        };

        if let Some(store_id) = effective_store {
            let store = self
                .store
                .find_store(store_id)
                .await?
                .ok_or_else(|| EngineError::not_found(format!("store {store_id} not found")))?;
            match store.status {
                StoreStatus::Deleted => {
                    return Err(EngineError::not_found(format!("store {store_id} not found")))
                }
                StoreStatus::Locked | StoreStatus::Rejected => {
                    return Err(EngineError::forbidden(format!(
                        "store account is {}",
                        store.status
                    )))
                }
                StoreStatus::Pending | StoreStatus::Active => {}
            }
        }

        if let Some(discount) = &submission.discount {
            if effective_store.is_none() {
                return Err(EngineError::forbidden(
                    "only store accounts can attach a discount",
                ));
            }
            validate_discount(discount)?;
        }

        // Advisory only; crowd-sourced barcodes are recorded either way.
        if matches!(barcode::check(barcode, barcode_type), BarcodeCheck::Invalid) {
            tracing::debug!(barcode, barcode_type, "submitted barcode fails its check digit");
        }

        let product_name = submission
            .product_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());
        let product = self
            .store
            .upsert_product(barcode, barcode_type, product_name)
            .await?;

        let observation = self
            .store
            .create_observation(NewObservation {
                product_id: product.id,
                store_id: effective_store,
                amount: submission.amount,
                currency,
                latitude: submission.latitude,
                longitude: submission.longitude,
                source: submitter.source(),
                confidence: submitter.confidence(),
                observed_at: submission.observed_at.unwrap_or(now),
            })
            .await?;

        let discount = match (&submission.discount, effective_store) {
            (Some(request), Some(store_id)) => {
                let result = self
                    .store
                    .create_discount(NewDiscount {
                        store_id,
                        product_id: Some(product.id),
                        kind: request.kind,
                        value: request.value,
                        description: request.description.clone(),
                        valid_from: request.valid_from,
                        valid_until: request.valid_until,
                    })
                    .await;
                match result {
                    Ok(record) => Some(record),
                    Err(err) => {
                        tracing::warn!(
                            error = %err,
                            observation_id = %observation.public_id,
                            "observation recorded but its discount was not",
                        );
                        None
                    }
                }
            }
            _ => None,
        };

        Ok(SubmissionReceipt {
            observation,
            discount,
        })
    }

    /// Record a batch of observations, attempting every item.
    ///
    /// Failed items are reported with their input index; any item failure,
    /// storage included, is confined to that item.
    ///
    /// # Errors
    ///
    /// [`EngineError::Validation`] when the batch itself is empty or larger
    /// than the configured maximum. Item-level failures never surface here.
    pub async fn submit_batch(
        &self,
        submissions: &[ObservationSubmission],
        submitter: Submitter,
        now: DateTime<Utc>,
    ) -> Result<BatchOutcome, EngineError> {
        if submissions.is_empty() {
            return Err(EngineError::validation(
                "observations",
                "at least one observation is required",
            ));
        }
        if submissions.len() > self.max_batch_size {
            return Err(EngineError::validation(
                "observations",
                format!(
                    "batch size exceeds the maximum of {}",
                    self.max_batch_size
                ),
            ));
        }

        let mut observations = Vec::new();
        let mut errors = Vec::new();
        for (index, submission) in submissions.iter().enumerate() {
            match self.submit(submission, submitter, now).await {
                Ok(receipt) => observations.push(receipt.observation),
                Err(err) => errors.push(BatchItemError {
                    index,
                    field: err.field(),
                    message: err.to_string(),
                }),
            }
        }

        Ok(BatchOutcome {
            processed: observations.len(),
            failed: errors.len(),
            errors,
            observations,
        })
    }

    fn resolve_currency(&self, requested: Option<&str>) -> Result<String, EngineError> {
        match requested.map(str::trim).filter(|code| !code.is_empty()) {
            None => Ok(self.default_currency.clone()),
            Some(code) => {
                if code.len() == 3 && code.bytes().all(|b| b.is_ascii_alphabetic()) {
                    Ok(code.to_ascii_uppercase())
                } else {
                    Err(EngineError::validation(
                        "currency",
                        "currency must be a three-letter code",
                    ))
                }
            }
        }
    }
}

fn validate_discount(discount: &DiscountSubmission) -> Result<(), EngineError> {
    if discount.value <= Decimal::ZERO {
        return Err(EngineError::validation(
            "discount.value",
            "discount value must be positive",
        ));
    }
    if discount.kind == DiscountKind::Percentage && discount.value > Decimal::from(100) {
        return Err(EngineError::validation(
            "discount.value",
            "percentage discount cannot exceed 100",
        ));
    }
    if discount.valid_from > discount.valid_until {
        return Err(EngineError::validation(
            "discount.valid_until",
            "validity window ends before it starts",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::memory::MemoryStore;
    use async_trait::async_trait;
    use chrono::Duration;
    use priceradar_core::{PriceSource, ProductRecord, StoreRecord};

    fn ingest(store: Arc<MemoryStore>) -> ObservationIngest {
        ObservationIngest::new(store, "EUR", 1000)
    }

    fn submission(amount: &str) -> ObservationSubmission {
        ObservationSubmission {
            barcode: "6408430000258".to_string(),
            barcode_type: "EAN13".to_string(),
            amount: amount.parse().unwrap(),
            latitude: 60.4518,
            longitude: 22.2666,
            product_name: None,
            currency: None,
            observed_at: None,
            store_id: None,
            discount: None,
        }
    }

    fn discount_request(value: i64) -> DiscountSubmission {
        let now = Utc::now();
        DiscountSubmission {
            kind: DiscountKind::Percentage,
            value: Decimal::from(value),
            description: Some("weekend offer".to_string()),
            valid_from: now,
            valid_until: now + Duration::days(2),
        }
    }

    #[tokio::test]
    async fn anonymous_submission_is_shopper_sourced_with_lower_confidence() {
        let store = Arc::new(MemoryStore::new());
        let ingest = ingest(Arc::clone(&store));
        let now = Utc::now();

        let receipt = ingest
            .submit(&submission("2.49"), Submitter::Anonymous, now)
            .await
            .unwrap();
        let obs = receipt.observation;
        assert_eq!(obs.source, PriceSource::Shopper);
        assert!((obs.confidence - 0.8).abs() < f64::EPSILON);
        assert!(obs.store_id.is_none());
        assert_eq!(obs.currency, "EUR");
        assert_eq!(obs.observed_at, now);
        assert!(obs.is_active);
    }

    #[tokio::test]
    async fn store_submission_attributes_to_own_store() {
        let store = Arc::new(MemoryStore::new());
        let shop = store
            .add_store("Corner Shop", StoreStatus::Active, 60.45, 22.26)
            .await;
        let ingest = ingest(Arc::clone(&store));

        let receipt = ingest
            .submit(
                &submission("2.49"),
                Submitter::Store { store_id: shop.id },
                Utc::now(),
            )
            .await
            .unwrap();
        let obs = receipt.observation;
        assert_eq!(obs.store_id, Some(shop.id));
        assert_eq!(obs.store_name.as_deref(), Some("Corner Shop"));
        assert_eq!(obs.source, PriceSource::StoreUser);
        assert!((obs.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn store_cannot_submit_for_another_store() {
        let store = Arc::new(MemoryStore::new());
        let shop = store
            .add_store("Corner Shop", StoreStatus::Active, 60.45, 22.26)
            .await;
        let ingest = ingest(Arc::clone(&store));

        let mut sub = submission("2.49");
        sub.store_id = Some(shop.id + 1);
        let err = ingest
            .submit(&sub, Submitter::Store { store_id: shop.id }, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));

        // Naming the own store explicitly is fine.
        sub.store_id = Some(shop.id);
        let receipt = ingest
            .submit(&sub, Submitter::Store { store_id: shop.id }, Utc::now())
            .await
            .unwrap();
        assert_eq!(receipt.observation.store_id, Some(shop.id));
    }

    #[tokio::test]
    async fn admin_and_anonymous_store_ids_are_ignored() {
        let store = Arc::new(MemoryStore::new());
        let shop = store
            .add_store("Corner Shop", StoreStatus::Active, 60.45, 22.26)
            .await;
        let ingest = ingest(Arc::clone(&store));

        let mut sub = submission("2.49");
        sub.store_id = Some(shop.id);
        let receipt = ingest.submit(&sub, Submitter::Admin, Utc::now()).await.unwrap();
        assert!(receipt.observation.store_id.is_none());
        assert_eq!(receipt.observation.source, PriceSource::Shopper);
        assert!((receipt.observation.confidence - 1.0).abs() < f64::EPSILON);

        let receipt = ingest
            .submit(&sub, Submitter::Anonymous, Utc::now())
            .await
            .unwrap();
        assert!(receipt.observation.store_id.is_none());
    }

    #[tokio::test]
    async fn store_account_state_gates_submission() {
        let store = Arc::new(MemoryStore::new());
        let locked = store
            .add_store("Locked", StoreStatus::Locked, 60.45, 22.26)
            .await;
        let deleted = store
            .add_store("Deleted", StoreStatus::Deleted, 60.45, 22.26)
            .await;
        let pending = store
            .add_store("Pending", StoreStatus::Pending, 60.45, 22.26)
            .await;
        let ingest = ingest(Arc::clone(&store));
        let sub = submission("2.49");

        let err = ingest
            .submit(&sub, Submitter::Store { store_id: locked.id }, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));

        let err = ingest
            .submit(&sub, Submitter::Store { store_id: deleted.id }, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));

        let err = ingest
            .submit(&sub, Submitter::Store { store_id: 9999 }, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));

        // A pending store may already report prices.
        assert!(ingest
            .submit(&sub, Submitter::Store { store_id: pending.id }, Utc::now())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn rejects_malformed_fields() {
        let store = Arc::new(MemoryStore::new());
        let ingest = ingest(store);

        let mut sub = submission("2.49");
        sub.amount = Decimal::ZERO;
        let err = ingest
            .submit(&sub, Submitter::Anonymous, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("amount"));

        let mut sub = submission("2.49");
        sub.barcode = "  ".to_string();
        let err = ingest
            .submit(&sub, Submitter::Anonymous, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("barcode"));

        let mut sub = submission("2.49");
        sub.longitude = 250.0;
        let err = ingest
            .submit(&sub, Submitter::Anonymous, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("longitude"));

        let mut sub = submission("2.49");
        sub.currency = Some("EURO".to_string());
        let err = ingest
            .submit(&sub, Submitter::Anonymous, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("currency"));
    }

    #[tokio::test]
    async fn currency_is_trimmed_and_uppercased() {
        let store = Arc::new(MemoryStore::new());
        let ingest = ingest(store);

        let mut sub = submission("2.49");
        sub.currency = Some(" usd ".to_string());
        let receipt = ingest
            .submit(&sub, Submitter::Anonymous, Utc::now())
            .await
            .unwrap();
        assert_eq!(receipt.observation.currency, "USD");
    }

    #[tokio::test]
    async fn failing_check_digit_is_advisory_only() {
        let store = Arc::new(MemoryStore::new());
        let ingest = ingest(store);

        let mut sub = submission("2.49");
        sub.barcode = "4006381333932".to_string();
        assert!(ingest
            .submit(&sub, Submitter::Anonymous, Utc::now())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn product_name_is_kept_when_later_submissions_omit_it() {
        let store = Arc::new(MemoryStore::new());
        let ingest = ingest(Arc::clone(&store));

        let mut named = submission("2.49");
        named.product_name = Some("Milk 1L".to_string());
        ingest
            .submit(&named, Submitter::Anonymous, Utc::now())
            .await
            .unwrap();
        ingest
            .submit(&submission("2.39"), Submitter::Anonymous, Utc::now())
            .await
            .unwrap();

        let product = store
            .upsert_product("6408430000258", "EAN13", None)
            .await
            .unwrap();
        assert_eq!(product.name.as_deref(), Some("Milk 1L"));
    }

    #[tokio::test]
    async fn discount_requires_store_identity_and_blocks_the_write() {
        let store = Arc::new(MemoryStore::new());
        let ingest = ingest(Arc::clone(&store));

        let mut sub = submission("2.49");
        sub.discount = Some(discount_request(10));
        let err = ingest
            .submit(&sub, Submitter::Anonymous, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));

        // Rejected before anything was written.
        let rows = store
            .find_active_observations("6408430000258", "EAN13")
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn discount_window_is_validated_before_any_write() {
        let store = Arc::new(MemoryStore::new());
        let shop = store
            .add_store("Corner Shop", StoreStatus::Active, 60.45, 22.26)
            .await;
        let ingest = ingest(Arc::clone(&store));

        let mut sub = submission("2.49");
        let mut bad = discount_request(10);
        bad.valid_until = bad.valid_from - Duration::hours(1);
        sub.discount = Some(bad);

        let err = ingest
            .submit(&sub, Submitter::Store { store_id: shop.id }, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("discount.valid_until"));

        let rows = store
            .find_active_observations("6408430000258", "EAN13")
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn percentage_discount_is_capped_at_100() {
        let store = Arc::new(MemoryStore::new());
        let shop = store
            .add_store("Corner Shop", StoreStatus::Active, 60.45, 22.26)
            .await;
        let ingest = ingest(store);

        let mut sub = submission("2.49");
        sub.discount = Some(discount_request(150));
        let err = ingest
            .submit(&sub, Submitter::Store { store_id: shop.id }, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("discount.value"));
    }

    #[tokio::test]
    async fn discount_is_scoped_to_the_submitted_product() {
        let store = Arc::new(MemoryStore::new());
        let shop = store
            .add_store("Corner Shop", StoreStatus::Active, 60.45, 22.26)
            .await;
        let ingest = ingest(Arc::clone(&store));

        let mut sub = submission("2.49");
        sub.discount = Some(discount_request(20));
        let receipt = ingest
            .submit(&sub, Submitter::Store { store_id: shop.id }, Utc::now())
            .await
            .unwrap();

        let discount = receipt.discount.unwrap();
        assert_eq!(discount.store_id, shop.id);
        assert_eq!(discount.product_id, Some(receipt.observation.product_id));
        assert_eq!(discount.value, Decimal::from(20));
    }

    /// Delegates everything to [`MemoryStore`] but refuses discounts.
    struct FailingDiscountStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl ObservationStore for FailingDiscountStore {
        async fn find_active_observations(
            &self,
            barcode: &str,
            barcode_type: &str,
        ) -> Result<Vec<ObservationRecord>, StoreError> {
            self.inner.find_active_observations(barcode, barcode_type).await
        }

        async fn find_store(&self, store_id: i64) -> Result<Option<StoreRecord>, StoreError> {
            self.inner.find_store(store_id).await
        }

        async fn upsert_product(
            &self,
            barcode: &str,
            barcode_type: &str,
            name: Option<&str>,
        ) -> Result<ProductRecord, StoreError> {
            self.inner.upsert_product(barcode, barcode_type, name).await
        }

        async fn create_observation(
            &self,
            observation: NewObservation,
        ) -> Result<ObservationRecord, StoreError> {
            self.inner.create_observation(observation).await
        }

        async fn find_active_discounts(
            &self,
            store_ids: &[i64],
            now: DateTime<Utc>,
        ) -> Result<Vec<DiscountRecord>, StoreError> {
            self.inner.find_active_discounts(store_ids, now).await
        }

        async fn create_discount(
            &self,
            _discount: NewDiscount,
        ) -> Result<DiscountRecord, StoreError> {
            Err(StoreError::Backend("no discounts today".into()))
        }
    }

    #[tokio::test]
    async fn discount_failure_does_not_void_the_observation() {
        let inner = MemoryStore::new();
        let shop = inner
            .add_store("Corner Shop", StoreStatus::Active, 60.45, 22.26)
            .await;
        let store = Arc::new(FailingDiscountStore { inner });
        let ingest = ObservationIngest::new(Arc::clone(&store) as _, "EUR", 1000);

        let mut sub = submission("2.49");
        sub.discount = Some(discount_request(20));
        let receipt = ingest
            .submit(&sub, Submitter::Store { store_id: shop.id }, Utc::now())
            .await
            .unwrap();
        assert!(receipt.discount.is_none());

        let rows = store
            .find_active_observations("6408430000258", "EAN13")
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn batch_rejects_empty_and_oversized_payloads() {
        let store = Arc::new(MemoryStore::new());
        let ingest = ObservationIngest::new(store, "EUR", 2);

        let err = ingest
            .submit_batch(&[], Submitter::Anonymous, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("observations"));

        let too_many = vec![submission("1.00"), submission("2.00"), submission("3.00")];
        let err = ingest
            .submit_batch(&too_many, Submitter::Anonymous, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("observations"));
    }

    #[tokio::test]
    async fn batch_records_valid_items_and_reports_the_rest() {
        let store = Arc::new(MemoryStore::new());
        let ingest = ingest(Arc::clone(&store));

        let mut bad = submission("2.00");
        bad.amount = Decimal::from(-1);
        let batch = vec![
            submission("1.00"),
            submission("2.00"),
            bad,
            submission("3.00"),
        ];

        let outcome = ingest
            .submit_batch(&batch, Submitter::Anonymous, Utc::now())
            .await
            .unwrap();
        assert_eq!(outcome.processed, 3);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.observations.len(), 3);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].index, 2);
        assert_eq!(outcome.errors[0].field, Some("amount"));

        let rows = store
            .find_active_observations("6408430000258", "EAN13")
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);
    }
}
