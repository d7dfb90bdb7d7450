// compliance-server/tests/http_surface.rs
// ============================================================================
// Module: Ingestion Server HTTP Surface Tests
// Description: End-to-end coverage of the HTTP surface table (§4.K): login,
//              submission acceptance, client/history queries, and the
//              triple-modal auth precedence.
// Purpose: Drive the real router with `tower::ServiceExt::oneshot` instead
//          of unit-testing handlers in isolation, so routing, extraction,
//          and error mapping are all exercised together.
// Dependencies: compliance-server, compliance-auth, compliance-store,
//               tower, axum, serde_json, tempfile
// ============================================================================

//! ## Overview
//! Every test builds a fresh in-memory store and a throwaway JWT secret;
//! none of this touches disk.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions use unwrap/expect for clarity.")]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::http::StatusCode;
use compliance_auth::AuthService;
use compliance_auth::JwtCodec;
use compliance_config::AppConfig;
use compliance_core::UserRole;
use compliance_server::ServerState;
use compliance_server::build_router;
use compliance_store::ComplianceStore;
use tower::ServiceExt;

fn test_router() -> (Router, Arc<ComplianceStore>) {
    let store = Arc::new(ComplianceStore::open_in_memory().expect("open in-memory store"));
    let jwt = JwtCodec::new("http-surface-test-secret-value", "compliance-toolkit", "compliance-toolkit-clients", 15, 7);
    let auth = Arc::new(AuthService::new(Arc::clone(&store), jwt, 90));
    let state = ServerState { store: Arc::clone(&store), auth, config: Arc::new(AppConfig::default()) };
    (build_router(state), store)
}

fn create_admin(store: &ComplianceStore, username: &str, password: &str) {
    let hash = compliance_auth::hash_password(password).expect("hash password");
    store.create_user(username, &hash, UserRole::Admin, chrono::Utc::now()).expect("create user");
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("read body");
    serde_json::from_slice(&bytes).expect("parse json body")
}

#[tokio::test]
async fn login_with_valid_credentials_returns_token_pair() {
    let (router, store) = test_router();
    create_admin(&store, "alice", "correct-horse-battery-staple");

    let request = Request::post("/api/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&serde_json::json!({"username": "alice", "password": "correct-horse-battery-staple"})).unwrap()))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
    assert_eq!(body["user"]["username"], "alice");
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthenticated() {
    let (router, store) = test_router();
    create_admin(&store, "alice", "correct-horse-battery-staple");

    let request = Request::post("/api/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&serde_json::json!({"username": "alice", "password": "wrong"})).unwrap()))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn submit_without_any_auth_is_rejected() {
    let (router, _store) = test_router();
    let request = Request::post("/api/v1/compliance/submit")
        .header("content-type", "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn submit_with_bearer_token_is_accepted_and_listed() {
    let (router, store) = test_router();
    create_admin(&store, "alice", "correct-horse-battery-staple");

    let login_request = Request::post("/api/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&serde_json::json!({"username": "alice", "password": "correct-horse-battery-staple"})).unwrap()))
        .unwrap();
    let login_response = router.clone().oneshot(login_request).await.unwrap();
    let login_body = body_json(login_response).await;
    let access_token = login_body["access_token"].as_str().unwrap().to_owned();

    let submission = serde_json::json!({
        "client_id": "agent-001",
        "hostname": "WORKSTATION-01",
        "timestamp": "2026-01-15T12:00:00Z",
        "report_type": "baseline",
        "report_version": "1.0",
        "compliance": {
            "overall_status": "COMPLETED",
            "total_checks": 1,
            "passed_checks": 1,
            "failed_checks": 0,
            "warning_checks": 0,
            "queries": [
                {"name": "check-one", "description": "example", "status": "PASS", "expected": "1", "actual": "1", "message": null}
            ]
        },
        "evidence": [{"name": "check-one"}],
        "system_info": {"os_version": "Windows Server 2022", "build_number": "20348", "architecture": "x86_64"}
    });
    let submit_request = Request::post("/api/v1/compliance/submit")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {access_token}"))
        .body(Body::from(serde_json::to_vec(&submission).unwrap()))
        .unwrap();
    let submit_response = router.clone().oneshot(submit_request).await.unwrap();
    assert_eq!(submit_response.status(), StatusCode::CREATED);
    let submit_body = body_json(submit_response).await;
    assert_eq!(submit_body["status"], "accepted");

    let clients_request =
        Request::get("/api/v1/clients").header("authorization", format!("Bearer {access_token}")).body(Body::empty()).unwrap();
    let clients_response = router.oneshot(clients_request).await.unwrap();
    assert_eq!(clients_response.status(), StatusCode::OK);
    let clients_body = body_json(clients_response).await;
    assert_eq!(clients_body.as_array().unwrap().len(), 1);
    assert_eq!(clients_body[0]["hostname"], "WORKSTATION-01");
}

#[tokio::test]
async fn me_requires_an_access_token() {
    let (router, _store) = test_router();
    let request = Request::get("/api/auth/me").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn dashboard_rejects_bearer_token_without_session_cookie() {
    let (router, store) = test_router();
    create_admin(&store, "alice", "correct-horse-battery-staple");

    let login_request = Request::post("/api/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&serde_json::json!({"username": "alice", "password": "correct-horse-battery-staple"})).unwrap()))
        .unwrap();
    let login_response = router.clone().oneshot(login_request).await.unwrap();
    let login_body = body_json(login_response).await;
    let access_token = login_body["access_token"].as_str().unwrap().to_owned();

    let dashboard_request =
        Request::get("/dashboard").header("authorization", format!("Bearer {access_token}")).body(Body::empty()).unwrap();
    let response = router.oneshot(dashboard_request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn dashboard_accepts_session_cookie() {
    let (router, store) = test_router();
    create_admin(&store, "alice", "correct-horse-battery-staple");

    let login_request = Request::post("/api/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&serde_json::json!({"username": "alice", "password": "correct-horse-battery-staple"})).unwrap()))
        .unwrap();
    let login_response = router.clone().oneshot(login_request).await.unwrap();
    let login_body = body_json(login_response).await;
    let access_token = login_body["access_token"].as_str().unwrap().to_owned();

    let dashboard_request =
        Request::get("/dashboard").header("cookie", format!("session_user={access_token}")).body(Body::empty()).unwrap();
    let response = router.oneshot(dashboard_request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
