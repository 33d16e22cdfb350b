use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use priceradar_core::{AppConfig, Submitter};

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Bearer-token identity maps used by [`attach_submitter`].
#[derive(Debug, Clone)]
pub struct AuthState {
    store_tokens: Arc<HashMap<String, i64>>,
    admin_tokens: Arc<HashSet<String>>,
}

impl AuthState {
    #[must_use]
    pub fn new(store_tokens: HashMap<String, i64>, admin_tokens: HashSet<String>) -> Self {
        Self {
            store_tokens: Arc::new(store_tokens),
            admin_tokens: Arc::new(admin_tokens),
        }
    }

    /// Builds the token maps from the loaded configuration.
    ///
    /// Empty maps are allowed: the service then accepts anonymous
    /// submissions only, which is a valid deployment for a read-mostly
    /// comparison site.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        if config.store_tokens.is_empty() && config.admin_tokens.is_empty() {
            tracing::warn!(
                "no store or admin tokens configured; every submission will be anonymous"
            );
        }
        Self::new(config.store_tokens.clone(), config.admin_tokens.clone())
    }

    /// Maps a presented token to an identity. `None` means the token is
    /// known to neither map.
    fn resolve(&self, token: &str) -> Option<Submitter> {
        if let Some(&store_id) = self.store_tokens.get(token) {
            return Some(Submitter::Store { store_id });
        }
        self.admin_tokens
            .contains(token)
            .then_some(Submitter::Admin)
    }
}

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: &'static str,
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware resolving the caller's [`Submitter`] identity.
///
/// No `Authorization` header means an anonymous shopper. A presented bearer
/// token must match a configured store or admin token; an unknown token is
/// rejected outright rather than downgraded to anonymous.
pub async fn attach_submitter(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    let submitter = match extract_bearer_token(req.headers().get(AUTHORIZATION)) {
        None => Submitter::Anonymous,
        Some(token) => match auth.resolve(token) {
            Some(submitter) => submitter,
            None => {
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(MiddlewareErrorBody {
                        error: MiddlewareError {
                            code: "unauthorized",
                            message: "unknown bearer token",
                        },
                    }),
                )
                    .into_response();
            }
        },
    };

    req.extensions_mut().insert(submitter);
    next.run(req).await
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_bearer_token_accepts_valid_header() {
        let header = HeaderValue::from_static("Bearer test-token");
        assert_eq!(extract_bearer_token(Some(&header)), Some("test-token"));
    }

    #[test]
    fn extract_bearer_token_rejects_non_bearer_header() {
        let header = HeaderValue::from_static("Basic abc123");
        assert_eq!(extract_bearer_token(Some(&header)), None);
    }

    fn auth_fixture() -> AuthState {
        let mut store_tokens = HashMap::new();
        store_tokens.insert("store-token-7".to_string(), 7);
        let mut admin_tokens = HashSet::new();
        admin_tokens.insert("admin-token".to_string());
        AuthState::new(store_tokens, admin_tokens)
    }

    #[test]
    fn store_token_resolves_to_its_own_store() {
        let auth = auth_fixture();
        assert_eq!(
            auth.resolve("store-token-7"),
            Some(Submitter::Store { store_id: 7 })
        );
    }

    #[test]
    fn admin_token_resolves_to_admin() {
        let auth = auth_fixture();
        assert_eq!(auth.resolve("admin-token"), Some(Submitter::Admin));
    }

    #[test]
    fn unknown_token_resolves_to_nothing() {
        let auth = auth_fixture();
        assert_eq!(auth.resolve("nope"), None);
    }
}
