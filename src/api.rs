//! HTTP surface for the access engine.
//!
//! Authentication is upstream: a trusted session layer injects the
//! caller's identity as headers (configurable, defaults
//! `x-hall-user-id` / `x-hall-user-email`). Requests without them get 401.
//! Admin-only endpoints additionally require the configured admin
//! permission (403 otherwise). Malformed input is rejected with 400 before
//! the engine is reached, and collaborator failure maps to 500 — never to
//! a quiet denial.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::cache::{AccessCache, InvalidatePattern};
use crate::directory::{DirectoryError, PermissionChecker};
use crate::engine::{AccessEngine, EngineError, EvaluateOptions};
use crate::policy::{PolicyRegistry, PolicySummary};
use crate::types::{AccessResult, Principal};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The evaluation engine.
    pub engine: Arc<AccessEngine>,
    /// Policy registry, for administrative listing.
    pub registry: Arc<PolicyRegistry>,
    /// Decision cache, for administrative stats/invalidation.
    pub cache: Arc<AccessCache>,
    /// Permission checker, for the admin guard.
    pub permissions: Arc<dyn PermissionChecker>,
    /// Permission key gating the admin endpoints.
    pub admin_permission: String,
    /// Maximum `entityIds` length accepted by the batch endpoint.
    pub max_batch_size: usize,
    /// Header carrying the authenticated user id.
    pub user_id_header: String,
    /// Header carrying the authenticated user email.
    pub user_email_header: String,
}

/// Build the router for the access API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/access/check", get(check))
        .route("/api/access/check-batch", post(check_batch))
        .route("/api/access/policies", get(list_policies))
        .route("/api/access/cache/stats", get(cache_stats))
        .route("/api/access/cache/invalidate", post(cache_invalidate))
        .route("/api/access/cache/clear", post(cache_clear))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve the access API until the process is stopped.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(state: AppState, bind_addr: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind_addr).await?;
    info!(addr = bind_addr, "access API listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Handler-level failures, mapped onto HTTP statuses.
#[derive(Debug)]
enum ApiError {
    /// Identity headers missing.
    Unauthorized,
    /// Authenticated but lacking the admin permission.
    Forbidden,
    /// Malformed query or body.
    BadRequest(String),
    /// Collaborator/storage failure.
    Internal(String),
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthenticated".to_owned()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "admin permission required".to_owned()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => {
                error!(error = %msg, "access evaluation infrastructure failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_owned(),
                )
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Identity & guards
// ---------------------------------------------------------------------------

fn principal_from_headers(state: &AppState, headers: &HeaderMap) -> Result<Principal, ApiError> {
    let id = headers
        .get(state.user_id_header.as_str())
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::Unauthorized)?;
    let email = headers
        .get(state.user_email_header.as_str())
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    Ok(Principal::new(id, email))
}

async fn require_admin(state: &AppState, principal: &Principal) -> Result<(), ApiError> {
    let is_admin = state
        .permissions
        .has_permission(&principal.id, &state.admin_permission)
        .await?;
    if is_admin {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckQuery {
    policy: Option<String>,
    entity_id: Option<String>,
}

/// Decision as serialized to clients. `evaluated_at` stays internal.
#[derive(Debug, Serialize)]
struct CheckResponse {
    granted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl From<AccessResult> for CheckResponse {
    fn from(result: AccessResult) -> Self {
        Self {
            granted: result.granted,
            reason: result.reason,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchRequest {
    policy: Option<String>,
    entity_ids: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct BatchResponse {
    results: HashMap<String, CheckResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    size: usize,
    max_size: usize,
    ttl_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvalidateRequest {
    user_id: Option<String>,
    policy_id: Option<String>,
    entity_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn check(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CheckQuery>,
) -> Result<Json<CheckResponse>, ApiError> {
    let principal = principal_from_headers(&state, &headers)?;
    let policy = query
        .policy
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing 'policy' query parameter".to_owned()))?;
    let entity_id = query
        .entity_id
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing 'entityId' query parameter".to_owned()))?;

    let result = state
        .engine
        .evaluate(&principal, &policy, &entity_id, EvaluateOptions::default())
        .await?;
    Ok(Json(result.into()))
}

async fn check_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, ApiError> {
    let principal = principal_from_headers(&state, &headers)?;
    let policy = body
        .policy
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing 'policy' field".to_owned()))?;
    let entity_ids = body
        .entity_ids
        .ok_or_else(|| ApiError::BadRequest("missing 'entityIds' field".to_owned()))?;
    if entity_ids.len() > state.max_batch_size {
        return Err(ApiError::BadRequest(format!(
            "entityIds exceeds maximum batch size of {}",
            state.max_batch_size
        )));
    }

    let results = state
        .engine
        .evaluate_batch(&principal, &policy, &entity_ids, EvaluateOptions::default())
        .await?;
    Ok(Json(BatchResponse {
        results: results
            .into_iter()
            .map(|(id, result)| (id, result.into()))
            .collect(),
    }))
}

async fn list_policies(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<PolicySummary>>, ApiError> {
    let principal = principal_from_headers(&state, &headers)?;
    require_admin(&state, &principal).await?;
    Ok(Json(state.registry.summaries()))
}

async fn cache_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<StatsResponse>, ApiError> {
    let principal = principal_from_headers(&state, &headers)?;
    require_admin(&state, &principal).await?;
    let stats = state.cache.stats();
    Ok(Json(StatsResponse {
        size: stats.size,
        max_size: stats.capacity,
        ttl_ms: u64::try_from(stats.ttl.as_millis()).unwrap_or(u64::MAX),
    }))
}

async fn cache_invalidate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<InvalidateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let principal = principal_from_headers(&state, &headers)?;
    require_admin(&state, &principal).await?;
    let pattern = InvalidatePattern {
        principal_id: body.user_id,
        policy_id: body.policy_id,
        entity_id: body.entity_id,
    };
    let invalidated = state.cache.invalidate(&pattern);
    info!(
        admin = %principal.id,
        invalidated,
        "cache entries invalidated"
    );
    Ok(Json(serde_json::json!({ "invalidated": invalidated })))
}

async fn cache_clear(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let principal = principal_from_headers(&state, &headers)?;
    require_admin(&state, &principal).await?;
    state.cache.clear();
    info!(admin = %principal.id, "cache cleared");
    Ok(Json(serde_json::json!({ "cleared": true })))
}
