//! HTTP-level tests for the coupon routes.
//!
//! Tests cover:
//! - Status codes for every route on success and failure
//! - camelCase wire format with ISO-8601 dates
//! - Error envelope and request id propagation
//! - Deferred re-validation observed through GET

mod common;

use std::time::Duration;

use axum::http::{Method, StatusCode};
use chrono::{DateTime, Utc};
use common::{response_json, TestApp};
use serde_json::{json, Value};

const DELAY: Duration = Duration::from_secs(3);

fn coupon_body(code: &str, discount_percent: i64) -> Value {
    json!({
        "code": code,
        "discountPercent": discount_percent,
        "expirationDate": "2099-12-06T19:42:00.000Z"
    })
}

async fn create(app: &TestApp, code: &str, discount_percent: i64) -> Value {
    let response = app
        .request(Method::POST, "/coupons", Some(coupon_body(code, discount_percent)))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    response_json(response).await
}

// ==================== Create ====================

#[tokio::test(start_paused = true)]
async fn create_returns_pending_record_in_camel_case() {
    let app = TestApp::in_memory(DELAY);

    let mut body = coupon_body("SDOAF34", 10);
    body["status"] = json!("valid");
    let response = app.request(Method::POST, "/coupons", Some(body)).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let created = response_json(response).await;
    assert_eq!(created["code"], "SDOAF34");
    assert_eq!(created["discountPercent"], 10);
    assert_eq!(created["status"], "pending");
    assert!(created.get("discount_percent").is_none());

    let expiration: DateTime<Utc> = created["expirationDate"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("ISO-8601 expirationDate");
    assert_eq!(expiration.to_rfc3339(), "2099-12-06T19:42:00+00:00");
    assert!(created["createdAt"]
        .as_str()
        .and_then(|s| s.parse::<DateTime<Utc>>().ok())
        .is_some());
}

#[tokio::test(start_paused = true)]
async fn duplicate_code_is_bad_request() {
    let app = TestApp::in_memory(DELAY);
    create(&app, "DKSAS1", 10).await;

    let response = app
        .request(Method::POST, "/coupons", Some(coupon_body("DKSAS1", 90)))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = response_json(response).await;
    assert_eq!(error["error"], "Bad Request");
    assert_eq!(error["message"], "A coupon with code DKSAS1 already exists");
}

#[tokio::test(start_paused = true)]
async fn invalid_payloads_are_bad_request() {
    let app = TestApp::in_memory(DELAY);

    let mut past = coupon_body("PAST01", 10);
    past["expirationDate"] = json!("2020-12-06T19:42:00.000Z");
    let mut bad_status = coupon_body("STATUS1", 10);
    bad_status["status"] = json!("expired");
    let mut empty_code_in_past = coupon_body("", 10);
    empty_code_in_past["expirationDate"] = json!("2020-12-06T19:42:00.000Z");

    let cases = [
        (past, "The expiration date must be a future date"),
        (coupon_body("ZERO01", 0), "discount percent"),
        (coupon_body("HIGH01", 101), "discount percent"),
        (bad_status, "status"),
        (coupon_body("AB", 10), "at least 3 characters"),
        (coupon_body("", 10), "at least 3 characters"),
        (empty_code_in_past, "The expiration date must be a future date"),
        (json!({ "code": "NODATE", "discountPercent": 10 }), "expirationDate"),
        (
            json!({ "code": "TYPES1", "discountPercent": "ten", "expirationDate": "2099-01-01T00:00:00Z" }),
            "discountPercent",
        ),
    ];

    for (body, fragment) in cases {
        let response = app.request(Method::POST, "/coupons", Some(body.clone())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "payload {body}");
        let error = response_json(response).await;
        let message = error["message"].as_str().unwrap_or_default();
        assert!(
            message.contains(fragment),
            "expected {fragment:?} in {message:?}"
        );
    }

    let list = response_json(app.request(Method::GET, "/coupons", None).await).await;
    assert_eq!(list, json!([]));
}

#[tokio::test(start_paused = true)]
async fn malformed_json_is_bad_request() {
    let app = TestApp::in_memory(DELAY);

    let response = app
        .request_raw(Method::POST, "/coupons", "{\"code\": \"BROKEN\",")
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ==================== Read ====================

#[tokio::test(start_paused = true)]
async fn list_is_empty_then_contains_every_created_coupon() {
    let app = TestApp::in_memory(DELAY);

    let response = app.request(Method::GET, "/coupons", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await, json!([]));

    for code in ["AAA1", "BBB2", "CCC3"] {
        create(&app, code, 10).await;
    }

    let listed = response_json(app.request(Method::GET, "/coupons", None).await).await;
    let mut codes: Vec<&str> = listed
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|c| c["code"].as_str())
        .collect();
    codes.sort();
    assert_eq!(codes, vec!["AAA1", "BBB2", "CCC3"]);
}

#[tokio::test(start_paused = true)]
async fn list_filters_by_status_and_discount() {
    let app = TestApp::in_memory(DELAY);
    create(&app, "LOW20", 20).await;
    create(&app, "HIGH80", 80).await;
    tokio::time::sleep(DELAY + Duration::from_millis(1)).await;

    let invalid =
        response_json(app.request(Method::GET, "/coupons?status=invalid", None).await).await;
    assert_eq!(invalid.as_array().map(Vec::len), Some(1));
    assert_eq!(invalid[0]["code"], "HIGH80");

    let by_discount =
        response_json(app.request(Method::GET, "/coupons?discountPercent=20", None).await).await;
    assert_eq!(by_discount[0]["code"], "LOW20");

    let response = app.request(Method::GET, "/coupons?status=expired", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test(start_paused = true)]
async fn get_missing_coupon_is_not_found_with_request_id() {
    let app = TestApp::in_memory(DELAY);

    let response = app
        .request_with_headers(
            Method::GET,
            "/coupons/F",
            None,
            &[("x-request-id", "req-coupon-404")],
        )
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("req-coupon-404")
    );
    let error = response_json(response).await;
    assert_eq!(error["error"], "Not Found");
    assert_eq!(error["message"], "Coupon F not found");
    assert_eq!(error["request_id"], "req-coupon-404");
}

#[tokio::test(start_paused = true)]
async fn get_returns_stored_coupon() {
    let app = TestApp::in_memory(DELAY);
    create(&app, "FETCH1", 15).await;

    let response = app.request(Method::GET, "/coupons/FETCH1", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let coupon = response_json(response).await;
    assert_eq!(coupon["code"], "FETCH1");
    assert_eq!(coupon["discountPercent"], 15);
}

// ==================== Update / Delete ====================

#[tokio::test(start_paused = true)]
async fn update_changes_fields_and_validates_them() {
    let app = TestApp::in_memory(DELAY);
    create(&app, "PATCH1", 10).await;

    let response = app
        .request(
            Method::PUT,
            "/coupons/PATCH1",
            Some(json!({ "discountPercent": 35, "status": "valid" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = response_json(response).await;
    assert_eq!(updated["discountPercent"], 35);
    assert_eq!(updated["status"], "valid");

    let response = app
        .request(
            Method::PUT,
            "/coupons/PATCH1",
            Some(json!({ "discountPercent": 0 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::PUT,
            "/coupons/MISSING",
            Some(json!({ "discountPercent": 20 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(start_paused = true)]
async fn delete_reports_success_then_not_found() {
    let app = TestApp::in_memory(DELAY);
    create(&app, "GONE01", 10).await;

    let response = app.request(Method::DELETE, "/coupons/GONE01", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response_json(response).await,
        json!({ "message": "Coupon deleted successfully" })
    );

    let response = app.request(Method::DELETE, "/coupons/GONE01", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // The pending re-validation must not bring it back
    tokio::time::sleep(DELAY * 2).await;
    let response = app.request(Method::GET, "/coupons/GONE01", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ==================== Deferred re-validation ====================

#[tokio::test(start_paused = true)]
async fn coupons_settle_after_the_delay() {
    let app = TestApp::in_memory(DELAY);
    create(&app, "DKSAS1", 51).await;
    create(&app, "DKSAS2", 20).await;
    create(&app, "HALF50", 50).await;

    let pending = response_json(app.request(Method::GET, "/coupons/DKSAS1", None).await).await;
    assert_eq!(pending["status"], "pending");

    tokio::time::sleep(DELAY + Duration::from_millis(1)).await;

    for (code, expected) in [("DKSAS1", "invalid"), ("DKSAS2", "valid"), ("HALF50", "valid")] {
        let coupon =
            response_json(app.request(Method::GET, &format!("/coupons/{code}"), None).await)
                .await;
        assert_eq!(coupon["status"], expected, "coupon {code}");
    }
}

// ==================== Operational routes ====================

#[tokio::test(start_paused = true)]
async fn health_banner_and_openapi_are_served() {
    let app = TestApp::in_memory(DELAY);

    let health = app.request(Method::GET, "/health", None).await;
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(response_json(health).await["status"], "up");

    let banner = app.request(Method::GET, "/", None).await;
    assert_eq!(banner.status(), StatusCode::OK);
    assert_eq!(response_json(banner).await["service"], "coupon-api");

    let doc = app.request(Method::GET, "/api-docs/openapi.json", None).await;
    assert_eq!(doc.status(), StatusCode::OK);
    assert!(response_json(doc).await["paths"]
        .get("/coupons/{code}")
        .is_some());
}
