use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use priceradar_core::{DiscountKind, Submitter};
use priceradar_engine::{
    BatchOutcome, DiscountSubmission, ObservationSubmission, SubmissionReceipt,
};

use crate::middleware::RequestId;

use super::{map_engine_error, ApiError, ApiResponse, AppState, ResponseMeta};

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct ObservationBody {
    pub barcode: String,
    pub barcode_type: String,
    pub amount: Decimal,
    pub latitude: f64,
    pub longitude: f64,
    pub product_name: Option<String>,
    pub currency: Option<String>,
    pub observed_at: Option<DateTime<Utc>>,
    pub store_id: Option<i64>,
    pub discount: Option<DiscountBody>,
}

#[derive(Debug, Deserialize)]
pub(super) struct DiscountBody {
    pub kind: DiscountKind,
    pub value: Decimal,
    pub description: Option<String>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BatchBody {
    pub observations: Vec<ObservationBody>,
}

impl From<ObservationBody> for ObservationSubmission {
    fn from(body: ObservationBody) -> Self {
        Self {
            barcode: body.barcode,
            barcode_type: body.barcode_type,
            amount: body.amount,
            latitude: body.latitude,
            longitude: body.longitude,
            product_name: body.product_name,
            currency: body.currency,
            observed_at: body.observed_at,
            store_id: body.store_id,
            discount: body.discount.map(DiscountSubmission::from),
        }
    }
}

impl From<DiscountBody> for DiscountSubmission {
    fn from(body: DiscountBody) -> Self {
        Self {
            kind: body.kind,
            value: body.value,
            description: body.description,
            valid_from: body.valid_from,
            valid_until: body.valid_until,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/prices/observations: record one sighted price.
pub(super) async fn submit_observation(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(submitter): Extension<Submitter>,
    Json(body): Json<ObservationBody>,
) -> Result<(StatusCode, Json<ApiResponse<SubmissionReceipt>>), ApiError> {
    let submission = ObservationSubmission::from(body);
    let receipt = state
        .ingest
        .submit(&submission, submitter, Utc::now())
        .await
        .map_err(|e| map_engine_error(req_id.0.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: receipt,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// POST /api/v1/prices/observations/batch: record many prices in one call.
/// Item failures are reported per index, never fatal for their siblings.
pub(super) async fn submit_batch(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(submitter): Extension<Submitter>,
    Json(body): Json<BatchBody>,
) -> Result<(StatusCode, Json<ApiResponse<BatchOutcome>>), ApiError> {
    let submissions: Vec<ObservationSubmission> =
        body.observations.into_iter().map(Into::into).collect();
    let outcome = state
        .ingest
        .submit_batch(&submissions, submitter, Utc::now())
        .await
        .map_err(|e| map_engine_error(req_id.0.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: outcome,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}
