//! HTTP surface coverage: identity extraction, admin guard, validation,
//! and the cache administration endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use hallgate::api::{router, AppState};
use hallgate::cache::AccessCache;
use hallgate::directory::memory::{InMemoryDirectory, InMemoryPermissions};
use hallgate::engine::AccessEngine;
use hallgate::policy::{catalog, PolicyRegistry};

const ADMIN_PERMISSION: &str = "admin.full";

async fn test_state() -> AppState {
    let registry = Arc::new(PolicyRegistry::new());
    catalog::register_defaults(&registry).expect("catalog");
    let cache = Arc::new(AccessCache::new(100, Duration::from_secs(60)));
    let permissions = Arc::new(InMemoryPermissions::new());
    let directory = Arc::new(InMemoryDirectory::new());

    permissions.grant("admin-1", ADMIN_PERMISSION).await;
    directory.add_contact("c-1", "maria@example.com").await;
    directory.add_worker("w-1", "c-1").await;

    let engine = Arc::new(AccessEngine::new(
        Arc::clone(&registry),
        Arc::clone(&cache),
        Arc::clone(&permissions) as Arc<dyn hallgate::directory::PermissionChecker>,
        Arc::clone(&directory) as Arc<dyn hallgate::directory::Directory>,
        ADMIN_PERMISSION,
    ));

    AppState {
        engine,
        registry,
        cache,
        permissions,
        admin_permission: ADMIN_PERMISSION.to_owned(),
        max_batch_size: 3,
        user_id_header: "x-hall-user-id".to_owned(),
        user_email_header: "x-hall-user-email".to_owned(),
    }
}

fn get(uri: &str, user: Option<(&str, &str)>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some((id, email)) = user {
        builder = builder
            .header("x-hall-user-id", id)
            .header("x-hall-user-email", email);
    }
    builder.body(Body::empty()).expect("request")
}

fn post_json(uri: &str, user: Option<(&str, &str)>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some((id, email)) = user {
        builder = builder
            .header("x-hall-user-id", id)
            .header("x-hall-user-email", email);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

// ---------- Identity ----------

#[tokio::test]
async fn check_without_identity_headers_is_unauthorized() {
    let app = router(test_state().await);
    let response = app
        .oneshot(get("/api/access/check?policy=worker.view&entityId=w-1", None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------- Check ----------

#[tokio::test]
async fn check_missing_policy_param_is_bad_request() {
    let app = router(test_state().await);
    let response = app
        .oneshot(get(
            "/api/access/check?entityId=w-1",
            Some(("u-1", "maria@example.com")),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn check_missing_entity_param_is_bad_request() {
    let app = router(test_state().await);
    let response = app
        .oneshot(get(
            "/api/access/check?policy=worker.view",
            Some(("u-1", "maria@example.com")),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn check_grants_via_ownership_linkage() {
    let app = router(test_state().await);
    let response = app
        .oneshot(get(
            "/api/access/check?policy=worker.view&entityId=w-1",
            Some(("u-1", "maria@example.com")),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["granted"], true);
}

#[tokio::test]
async fn check_denies_stranger_with_reason() {
    let app = router(test_state().await);
    let response = app
        .oneshot(get(
            "/api/access/check?policy=worker.view&entityId=w-1",
            Some(("u-2", "stranger@example.com")),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["granted"], false);
    assert_eq!(json["reason"], "no matching access rules");
}

// ---------- Batch ----------

#[tokio::test]
async fn batch_over_cap_is_bad_request() {
    let app = router(test_state().await);
    let response = app
        .oneshot(post_json(
            "/api/access/check-batch",
            Some(("u-1", "maria@example.com")),
            serde_json::json!({
                "policy": "worker.view",
                "entityIds": ["a", "b", "c", "d"]
            }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn batch_returns_result_per_entity() {
    let app = router(test_state().await);
    let response = app
        .oneshot(post_json(
            "/api/access/check-batch",
            Some(("u-1", "maria@example.com")),
            serde_json::json!({
                "policy": "worker.view",
                "entityIds": ["w-1", "w-9"]
            }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["results"]["w-1"]["granted"], true);
    assert_eq!(json["results"]["w-9"]["granted"], false);
}

#[tokio::test]
async fn batch_missing_entity_ids_is_bad_request() {
    let app = router(test_state().await);
    let response = app
        .oneshot(post_json(
            "/api/access/check-batch",
            Some(("u-1", "maria@example.com")),
            serde_json::json!({ "policy": "worker.view" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------- Admin guard ----------

#[tokio::test]
async fn admin_endpoints_forbidden_for_non_admins() {
    let state = test_state().await;
    let user = Some(("u-1", "maria@example.com"));

    for request in [
        get("/api/access/policies", user),
        get("/api/access/cache/stats", user),
        post_json("/api/access/cache/invalidate", user, serde_json::json!({})),
        post_json("/api/access/cache/clear", user, serde_json::json!({})),
    ] {
        let response = router(state.clone()).oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn policies_listing_omits_rule_bodies() {
    let app = router(test_state().await);
    let response = app
        .oneshot(get(
            "/api/access/policies",
            Some(("admin-1", "admin@example.com")),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let policies = json.as_array().expect("array");
    assert_eq!(policies.len(), 5);
    for policy in policies {
        assert!(policy.get("rules").is_none(), "rules leaked: {policy}");
        assert!(policy.get("id").is_some());
        assert!(policy.get("entityType").is_some());
    }
}

// ---------- Cache administration ----------

#[tokio::test]
async fn cache_stats_reports_shape() {
    let app = router(test_state().await);
    let response = app
        .oneshot(get(
            "/api/access/cache/stats",
            Some(("admin-1", "admin@example.com")),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["size"], 0);
    assert_eq!(json["maxSize"], 100);
    assert_eq!(json["ttlMs"], 60_000);
}

#[tokio::test]
async fn invalidate_removes_matching_decisions() {
    let state = test_state().await;

    // Warm the cache with one decision.
    let response = router(state.clone())
        .oneshot(get(
            "/api/access/check?policy=worker.view&entityId=w-1",
            Some(("u-1", "maria@example.com")),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(state.cache.stats().size, 1);

    let response = router(state.clone())
        .oneshot(post_json(
            "/api/access/cache/invalidate",
            Some(("admin-1", "admin@example.com")),
            serde_json::json!({ "userId": "u-1" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["invalidated"], 1);
    assert_eq!(state.cache.stats().size, 0);
}

#[tokio::test]
async fn invalidate_with_empty_pattern_removes_nothing() {
    let state = test_state().await;

    router(state.clone())
        .oneshot(get(
            "/api/access/check?policy=worker.view&entityId=w-1",
            Some(("u-1", "maria@example.com")),
        ))
        .await
        .expect("response");
    assert_eq!(state.cache.stats().size, 1);

    let response = router(state.clone())
        .oneshot(post_json(
            "/api/access/cache/invalidate",
            Some(("admin-1", "admin@example.com")),
            serde_json::json!({}),
        ))
        .await
        .expect("response");

    let json = body_json(response).await;
    assert_eq!(json["invalidated"], 0);
    assert_eq!(state.cache.stats().size, 1);
}

#[tokio::test]
async fn clear_empties_the_cache() {
    let state = test_state().await;

    router(state.clone())
        .oneshot(get(
            "/api/access/check?policy=worker.view&entityId=w-1",
            Some(("u-1", "maria@example.com")),
        ))
        .await
        .expect("response");
    assert_eq!(state.cache.stats().size, 1);

    let response = router(state.clone())
        .oneshot(post_json(
            "/api/access/cache/clear",
            Some(("admin-1", "admin@example.com")),
            serde_json::json!({}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["cleared"], true);
    assert_eq!(state.cache.stats().size, 0);
}
