//! HTTP-level tests for the payment flow paths that settle before any
//! database work: webhook authentication, input validation and route guards.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use hmac::{Hmac, Mac};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use sha2::Sha256;
use tower::ServiceExt;

use shamba_api::config::PayheroConfig;
use shamba_api::models::user::Claims;
use shamba_api::routes;
use shamba_api::services::payhero_service::PayheroService;
use shamba_api::state::AppState;

const WEBHOOK_SECRET: &str = "whsec_test123secret456";
const JWT_SECRET: &str = "test-secret";
const TEST_USER_ID: &str = "665f1f77bcf86cd799439011";

fn test_config() -> PayheroConfig {
    PayheroConfig {
        api_username: "sandbox".to_string(),
        api_password: "sandbox-pass".to_string(),
        channel_id: 4639,
        callback_url: "http://localhost:10000/api/payments/callback".to_string(),
        webhook_secret: WEBHOOK_SECRET.to_string(),
        unlock_amount: 10.0,
        api_base: "http://127.0.0.1:1".to_string(),
    }
}

// The Mongo client connects lazily; none of these tests reach the database,
// so no server needs to be running.
async fn test_state(with_payhero: bool) -> AppState {
    let client = mongodb::Client::with_uri_str("mongodb://127.0.0.1:27017")
        .await
        .expect("client options should parse");

    let mut state = AppState::new(client.database("shambadb_test"));
    if with_payhero {
        state = state.with_payhero(Arc::new(PayheroService::new(test_config())));
    }
    state
}

fn sign(payload: &[u8], secret: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("any key size works");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

fn bearer_token(sub: &str) -> String {
    std::env::set_var("JWT_SECRET", JWT_SECRET);

    let claims = Claims {
        sub: sub.to_string(),
        email: "farmer@example.com".to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("token should encode")
}

fn callback_request(payload: Vec<u8>, signature: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/payments/callback")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header("x-payhero-signature", signature);
    }
    builder.body(Body::from(payload)).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ============ Callback signature verification ============

#[tokio::test]
async fn callback_without_signature_is_rejected() {
    let app = routes::app(test_state(true).await);
    let payload = json!({ "success": true }).to_string().into_bytes();

    let response = app.oneshot(callback_request(payload, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn callback_with_wrong_secret_is_rejected() {
    let app = routes::app(test_state(true).await);
    let payload = json!({ "success": true }).to_string().into_bytes();
    let signature = sign(&payload, "wrong_secret");

    let response = app
        .oneshot(callback_request(payload, Some(signature)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn callback_with_tampered_body_is_rejected() {
    let app = routes::app(test_state(true).await);
    let original = json!({ "success": true }).to_string().into_bytes();
    let tampered = json!({ "success": true, "hacked": true })
        .to_string()
        .into_bytes();
    let signature = sign(&original, WEBHOOK_SECRET);

    let response = app
        .oneshot(callback_request(tampered, Some(signature)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn authentic_but_unparseable_callback_still_acks() {
    // An authenticated payload we cannot parse is our problem to log, not
    // the provider's to retry.
    let app = routes::app(test_state(true).await);
    let payload = br#"{"unexpected": "shape"}"#.to_vec();
    let signature = sign(&payload, WEBHOOK_SECRET);

    let response = app
        .oneshot(callback_request(payload, Some(signature)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "received": true }));
}

#[tokio::test]
async fn authentic_failure_without_response_block_still_acks() {
    let app = routes::app(test_state(true).await);
    let payload = json!({ "success": false }).to_string().into_bytes();
    let signature = sign(&payload, WEBHOOK_SECRET);

    let response = app
        .oneshot(callback_request(payload, Some(signature)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "received": true }));
}

#[tokio::test]
async fn callback_without_configured_provider_returns_503() {
    let app = routes::app(test_state(false).await);
    let payload = json!({ "success": true }).to_string().into_bytes();
    let signature = sign(&payload, WEBHOOK_SECRET);

    let response = app
        .oneshot(callback_request(payload, Some(signature)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// ============ Payment initiation guards ============

#[tokio::test]
async fn stk_push_requires_bearer_token() {
    let app = routes::app(test_state(true).await);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/payments/stk-push")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "phone": "0712345678" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn stk_push_rejects_invalid_phone_before_any_side_effect() {
    let app = routes::app(test_state(true).await);
    let token = bearer_token(TEST_USER_ID);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/payments/stk-push")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::from(json!({ "phone": "12345" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn stk_push_without_configured_provider_returns_503() {
    let app = routes::app(test_state(false).await);
    let token = bearer_token(TEST_USER_ID);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/payments/stk-push")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::from(json!({ "phone": "0712345678" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// ============ Route guards ============

#[tokio::test]
async fn market_prices_require_auth() {
    let app = routes::app(test_state(true).await);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/market/prices")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_requires_auth() {
    let app = routes::app(test_state(true).await);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/profile")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_is_public() {
    let app = routes::app(test_state(true).await);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("healthy"));
}
