mod common;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use barakah_ledger::guidance::{GuidanceError, TextGenerator};
use barakah_ledger::ledger::RetryPolicy;
use barakah_ledger::store::MemoryStore;
use barakah_ledger::{create_app, AppState};
use common::setup;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct CannedGenerator(&'static str);

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GuidanceError> {
        Ok(self.0.to_string())
    }
}

fn app() -> Router {
    setup();
    create_app(AppState::new(Arc::new(MemoryStore::new()), RetryPolicy::default()))
}

async fn send(app: &Router, method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Creates a business and a funding request owned by `owner`; returns the request id.
async fn open_request(app: &Router, owner: &str, goal: Value) -> String {
    let (status, business) = send(
        app,
        "POST",
        "/businesses",
        Some(owner),
        Some(json!({ "name": "Yusuf's Eid Bakery", "category": "Crafts & Goods" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, request) = send(
        app,
        "POST",
        "/requests",
        Some(owner),
        Some(json!({ "business_id": business["id"], "funding_goal": goal, "breakdown": "New oven" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", request);
    request["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"Service is healthy");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let (status, doc) = send(&app(), "GET", "/api-doc/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/requests/{id}/transactions"]["post"].is_object());
    assert!(doc["paths"]["/ledger"]["get"].is_object());
}

#[tokio::test]
async fn test_funding_flow_over_http() {
    let app = app();
    let (status, _) = send(&app, "PUT", "/users/c1", Some("c1"), Some(json!({ "display_name": "Samira A." }))).await;
    assert_eq!(status, StatusCode::OK);

    let request_id = open_request(&app, "yusuf", json!(800)).await;
    let uri = format!("/requests/{}/transactions", request_id);

    for (user, amount, kind) in [("c1", json!(300), "Loan"), ("c2", json!("200.00"), "Donation"), ("c3", json!(300), "loan")] {
        let (status, tx) = send(&app, "POST", &uri, Some(user), Some(json!({ "amount": amount, "type": kind }))).await;
        assert_eq!(status, StatusCode::CREATED, "{}", tx);
        assert_eq!(tx["status"], "Completed");
        assert_eq!(tx["borrower_id"], "yusuf");
    }

    let (status, summary) = send(&app, "GET", &format!("/requests/{}", request_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["request"]["status"], "Funded");
    assert_eq!(summary["totals"]["loans_raised"], 600.0);
    assert_eq!(summary["totals"]["donations_raised"], 200.0);
    assert_eq!(summary["progress_percent"], 100.0);

    let (status, ledger) = send(&app, "GET", "/ledger", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = ledger.as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[2]["from"], "Samira A.");
    assert_eq!(entries[2]["to"], "Yusuf's Eid Bakery");
    assert_eq!(entries[1]["from"], "Anonymous");

    let (status, dashboard) = send(&app, "GET", "/contributors/c1/dashboard", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["stats"]["total_contributed"], 300.0);
    assert_eq!(dashboard["stats"]["barakah_points"], 300);
    assert_eq!(dashboard["contributions"][0]["business_name"], "Yusuf's Eid Bakery");

    let (status, track) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(track["loans"].as_array().unwrap().len(), 2);

    let (status, requests) = send(&app, "GET", "/borrowers/yusuf/requests", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(requests.as_array().unwrap().len(), 1);

    let (status, cards) = send(&app, "GET", "/requests", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cards[0]["category"], "Crafts & Goods");
    assert_eq!(cards[0]["description"], "No description available.");

    let (status, progress) = send(&app, "GET", "/community/progress", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(progress["funded_count"], 1);
}

#[tokio::test]
async fn test_repayment_by_borrower() {
    let app = app();
    let request_id = open_request(&app, "yusuf", json!(100)).await;
    let uri = format!("/requests/{}/transactions", request_id);

    let (status, _) = send(&app, "POST", &uri, Some("c1"), Some(json!({ "amount": 100, "type": "Loan" }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "POST", &uri, Some("c1"), Some(json!({ "amount": 40, "type": "Repayment" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["retryable"], false);

    let (status, _) = send(&app, "POST", &uri, Some("yusuf"), Some(json!({ "amount": 40, "type": "Repayment" }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, repayments) = send(&app, "GET", "/borrowers/yusuf/repayments", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(repayments.as_array().unwrap().len(), 1);

    let (_, ledger) = send(&app, "GET", "/ledger", None, None).await;
    assert_eq!(ledger[0]["type"], "Repayment");
    assert_eq!(ledger[0]["to"], "Platform");
}

#[tokio::test]
async fn test_recording_requires_identity() {
    let app = app();
    let request_id = open_request(&app, "yusuf", json!(800)).await;
    let (status, body) = send(
        &app,
        "POST",
        &format!("/requests/{}/transactions", request_id),
        None,
        Some(json!({ "amount": 50, "type": "Donation" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("x-user-id"));

    let (status, _) = send(&app, "POST", "/businesses", None, Some(json!({ "name": "Anything" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_amounts_are_rejected() {
    let app = app();
    let request_id = open_request(&app, "yusuf", json!(800)).await;
    let uri = format!("/requests/{}/transactions", request_id);

    for amount in [json!(0), json!(-25), json!("abc"), json!(null)] {
        let (status, body) = send(&app, "POST", &uri, Some("c1"), Some(json!({ "amount": amount, "type": "Loan" }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", amount);
        assert_eq!(body["retryable"], false);
    }

    let (_, ledger) = send(&app, "GET", "/ledger", None, None).await;
    assert!(ledger.as_array().unwrap().is_empty());

    let (status, _) = send(&app, "POST", &uri, Some("c1"), Some(json!({ "amount": 10, "type": "Gift" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_amounts_are_unprocessable() {
    let app = app();
    let request_id = open_request(&app, "yusuf", json!(800)).await;
    let uri = format!("/requests/{}/transactions", request_id);

    for amount in [json!("79228162514264337593543950335"), json!("1000000000000000000")] {
        let (status, body) = send(&app, "POST", &uri, Some("c1"), Some(json!({ "amount": amount, "type": "Loan" }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", amount);
        assert_eq!(body["retryable"], false);
    }

    let (status, _) = send(&app, "POST", &uri, Some("c1"), Some(json!({ "amount": 50, "type": "Loan" }))).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_unknown_request_no_longer_accepts_funding() {
    let app = app();
    let uri = format!("/requests/{}/transactions", uuid::Uuid::new_v4());
    let (status, body) = send(&app, "POST", &uri, Some("c1"), Some(json!({ "amount": 10, "type": "Loan" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("no longer accepts funding"));

    let (status, _) = send(&app, "GET", &format!("/requests/{}", uuid::Uuid::new_v4()), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_users_cannot_rename_each_other() {
    let (status, _) = send(&app(), "PUT", "/users/c1", Some("c2"), Some(json!({ "display_name": "Mallory" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_guidance_requires_a_generator() {
    let body = json!({
        "goal_description": "Launch 5 Businesses This Month!",
        "progress_percentage": 60.0,
        "recent_activities": ["Samira A. contributed $150.00 to Yusuf's Eid Bakery."]
    });

    let (status, error) = send(&app(), "POST", "/community/guidance", None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error["retryable"], false);

    let state = AppState::new(Arc::new(MemoryStore::new()), RetryPolicy::default())
        .with_guidance(Arc::new(CannedGenerator("Invite a friend to match your next donation.")));
    let app = create_app(state);
    let (status, out) = send(&app, "POST", "/community/guidance", None, Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out["guidance"], "Invite a friend to match your next donation.");
}

#[tokio::test]
async fn test_fraud_analysis_reports_flags() {
    let state = AppState::new(Arc::new(MemoryStore::new()), RetryPolicy::default())
        .with_guidance(Arc::new(CannedGenerator("  ")));
    let app = create_app(state);

    let (status, out) = send(&app, "POST", "/admin/fraud-analysis", None, Some(json!({ "user_actions": "u4 changed payout account" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out["flagged_activities"], "");
}
