mod nearby;
mod observations;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use priceradar_engine::{EngineError, NearbyPriceEngine, ObservationIngest};

use crate::middleware::{attach_submitter, request_id, AuthState, RequestId};

/// Shared handler state.
///
/// `pool` is only what the health endpoint reports on; handlers go through
/// the engine. It is `None` when the engine runs on a non-Postgres store.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<NearbyPriceEngine>,
    pub ingest: Arc<ObservationIngest>,
    pub pool: Option<PgPool>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
                field: None,
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "forbidden" => StatusCode::FORBIDDEN,
            "validation_error" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Rejects an absent query parameter with an enveloped 400 naming the field.
pub(super) fn required_param<T>(
    request_id: &str,
    field: &'static str,
    value: Option<T>,
) -> Result<T, ApiError> {
    value.ok_or_else(|| {
        let mut err = ApiError::new(
            request_id,
            "validation_error",
            format!("{field} is a required query parameter"),
        );
        err.error.field = Some(field);
        err
    })
}

pub(super) fn map_engine_error(request_id: String, error: &EngineError) -> ApiError {
    let (code, message) = match error {
        EngineError::Validation { message, .. } => ("validation_error", message.clone()),
        EngineError::Forbidden(reason) => ("forbidden", reason.clone()),
        EngineError::NotFound(what) => ("not_found", what.clone()),
        EngineError::Storage(inner) => {
            tracing::error!(error = %inner, "storage backend failed");
            ("storage_error", "storage backend failed".to_string())
        }
    };
    let mut api = ApiError::new(request_id, code, message);
    api.error.field = error.field();
    api
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn prices_router(auth: AuthState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/prices/nearby", get(nearby::nearby_prices))
        .route(
            "/api/v1/prices/observations",
            post(observations::submit_observation),
        )
        .route(
            "/api/v1/prices/observations/batch",
            post(observations::submit_batch),
        )
        .layer(axum::middleware::from_fn_with_state(auth, attach_submitter))
}

pub fn build_app(state: AppState, auth: AuthState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(prices_router(auth))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    let Some(pool) = state.pool.as_ref() else {
        return (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "not_configured",
                },
                meta,
            }),
        );
    };

    match priceradar_db::health_check(pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use priceradar_engine::{MemoryStore, ObservationStore};
    use tower::ServiceExt;

    fn memory_app() -> Router {
        let store = Arc::new(MemoryStore::new());
        let engine = Arc::new(NearbyPriceEngine::new(
            Arc::clone(&store) as Arc<dyn ObservationStore>,
            5.0,
            50.0,
        ));
        let ingest = Arc::new(ObservationIngest::new(store as _, "EUR", 100));
        build_app(
            AppState {
                engine,
                ingest,
                pool: None,
            },
            AuthState::new(HashMap::new(), HashSet::new()),
        )
    }

    #[test]
    fn api_error_statuses_follow_their_codes() {
        let cases = [
            ("validation_error", StatusCode::BAD_REQUEST),
            ("forbidden", StatusCode::FORBIDDEN),
            ("not_found", StatusCode::NOT_FOUND),
            ("storage_error", StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (code, status) in cases {
            let response = ApiError::new("req-1", code, "boom").into_response();
            assert_eq!(response.status(), status, "code {code}");
        }
    }

    #[test]
    fn error_body_omits_an_absent_field() {
        let err = ApiError::new("req-1", "not_found", "no such store");
        let value = serde_json::to_value(&err).expect("serialize");
        assert!(value["error"].get("field").is_none());

        let err = required_param::<f64>("req-1", "lat", None).unwrap_err();
        let value = serde_json::to_value(&err).expect("serialize");
        assert_eq!(value["error"]["field"], "lat");
    }

    #[test]
    fn engine_errors_keep_their_validation_field() {
        let err = EngineError::validation("radius_km", "radius must be positive");
        let api = map_engine_error("req-1".to_string(), &err);
        assert_eq!(api.error.code, "validation_error");
        assert_eq!(api.error.field, Some("radius_km"));
        assert_eq!(api.error.message, "radius must be positive");
    }

    #[tokio::test]
    async fn health_without_a_database_reports_not_configured() {
        let response = memory_app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["data"]["status"], "ok");
        assert_eq!(json["data"]["database"], "not_configured");
        assert!(json["meta"]["request_id"].is_string());
    }

    #[tokio::test]
    async fn request_id_header_is_echoed_into_the_envelope() {
        let response = memory_app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .header("x-request-id", "trace-me-42")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(
            response
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok()),
            Some("trace-me-42")
        );
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["meta"]["request_id"], "trace-me-42");
    }

    #[tokio::test]
    async fn unknown_bearer_token_is_rejected_on_price_routes() {
        let response = memory_app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/prices/nearby?barcode=1&barcode_type=EAN13&lat=60.0&lon=22.0")
                    .header("authorization", "Bearer who-is-this")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["error"]["code"], "unauthorized");
    }

    #[tokio::test]
    async fn health_stays_public_even_with_a_bad_token() {
        let response = memory_app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .header("authorization", "Bearer who-is-this")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }
}
