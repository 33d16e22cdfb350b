use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;

use priceradar_engine::{NearbyPrices, NearbyQuery};

use crate::middleware::RequestId;

use super::{map_engine_error, required_param, ApiError, ApiResponse, AppState, ResponseMeta};

/// Query string for `GET /api/v1/prices/nearby`. Everything is optional at
/// the wire level so a missing value surfaces as an enveloped validation
/// error instead of a bare extractor rejection.
#[derive(Debug, Deserialize)]
pub(super) struct NearbyParams {
    pub barcode: Option<String>,
    pub barcode_type: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub radius_km: Option<f64>,
}

/// GET /api/v1/prices/nearby: compare prices for one product around a point.
pub(super) async fn nearby_prices(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<NearbyParams>,
) -> Result<Json<ApiResponse<NearbyPrices>>, ApiError> {
    let query = NearbyQuery {
        barcode: required_param(&req_id.0, "barcode", params.barcode)?,
        barcode_type: required_param(&req_id.0, "barcode_type", params.barcode_type)?,
        latitude: required_param(&req_id.0, "lat", params.lat)?,
        longitude: required_param(&req_id.0, "lon", params.lon)?,
        radius_km: params.radius_km,
    };

    let found = state
        .engine
        .find_nearby(&query, Utc::now())
        .await
        .map_err(|e| map_engine_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: found,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use priceradar_core::{NewObservation, PriceSource, StoreStatus};
    use priceradar_engine::{
        MemoryStore, NearbyPriceEngine, ObservationIngest, ObservationStore,
    };
    use tower::ServiceExt;

    use super::super::{build_app, AppState};
    use crate::middleware::AuthState;

    const CENTER_LAT: f64 = 60.4518;
    const CENTER_LON: f64 = 22.2666;

    fn app(store: Arc<MemoryStore>) -> Router {
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

    async fn seed_one_price(store: &MemoryStore, amount: &str) {
        let shop = store
            .add_store("Corner Shop", StoreStatus::Active, CENTER_LAT, CENTER_LON)
            .await;
        let product = store
            .upsert_product("6408430000258", "EAN13", Some("Milk 1L"))
            .await
            .expect("product");
        store
            .create_observation(NewObservation {
                product_id: product.id,
                store_id: Some(shop.id),
                amount: amount.parse().expect("amount"),
                currency: "EUR".to_string(),
                latitude: CENTER_LAT,
                longitude: CENTER_LON,
                source: PriceSource::StoreUser,
                confidence: 1.0,
                observed_at: chrono::Utc::now(),
            })
            .await
            .expect("observation");
    }

    async fn get_json(
        app: Router,
        uri: &str,
    ) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = serde_json::from_slice(&body).expect("json parse");
        (status, json)
    }

    #[tokio::test]
    async fn missing_query_parameters_get_an_enveloped_error() {
        let store = Arc::new(MemoryStore::new());
        let (status, json) = get_json(app(store), "/api/v1/prices/nearby").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "validation_error");
        assert_eq!(json["error"]["field"], "barcode");
        assert!(json["meta"]["request_id"].is_string());
    }

    #[tokio::test]
    async fn known_product_lists_nearby_prices() {
        let store = Arc::new(MemoryStore::new());
        seed_one_price(&store, "3.99").await;

        let uri = format!(
            "/api/v1/prices/nearby?barcode=6408430000258&barcode_type=EAN13&lat={CENTER_LAT}&lon={CENTER_LON}"
        );
        let (status, json) = get_json(app(store), &uri).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["summary"]["count"], 1);
        assert_eq!(json["data"]["results"][0]["price"], "3.99");
        assert_eq!(json["data"]["results"][0]["store_name"], "Corner Shop");
        assert_eq!(json["data"]["results"][0]["label"], "very inexpensive");
        let radius = json["data"]["search_area"]["radius_km"]
            .as_f64()
            .expect("radius");
        assert!((radius - 5.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn unknown_product_is_an_empty_ok_response() {
        let store = Arc::new(MemoryStore::new());
        let uri = format!(
            "/api/v1/prices/nearby?barcode=0000000000000&barcode_type=EAN13&lat={CENTER_LAT}&lon={CENTER_LON}"
        );
        let (status, json) = get_json(app(store), &uri).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["results"], serde_json::json!([]));
        assert_eq!(json["data"]["summary"]["count"], 0);
        assert_eq!(json["data"]["summary"]["min_price"], serde_json::Value::Null);
        assert!(json["data"]["message"].is_string());
    }

    #[tokio::test]
    async fn out_of_range_coordinates_are_rejected() {
        let store = Arc::new(MemoryStore::new());
        let uri = "/api/v1/prices/nearby?barcode=1&barcode_type=EAN13&lat=91.0&lon=22.0";
        let (status, json) = get_json(app(store), uri).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "validation_error");
        assert_eq!(json["error"]["field"], "latitude");
    }
}
