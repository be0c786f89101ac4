use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use crate::handlers::payment_handlers;
use crate::middleware::auth::auth_middleware;
use crate::state::AppState;

pub fn payment_routes() -> Router<AppState> {
    let protected = Router::new()
        .route("/stk-push", post(payment_handlers::initiate_payment))
        .route("/simulate", post(payment_handlers::simulate_unlock))
        .route("/history", get(payment_handlers::get_payment_history))
        .route_layer(middleware::from_fn(auth_middleware));

    Router::new()
        // Health
        .route("/health", get(payments_health))
        // Provider-facing
        .route("/callback", post(payment_handlers::payhero_callback))
        // Polled by the frontend while the STK prompt is open
        .route(
            "/check-payment-status",
            post(payment_handlers::check_payment_status),
        )
        .merge(protected)
}

async fn payments_health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "payments",
        "timestamp": Utc::now().to_rfc3339(),
        "features": ["stk-push", "callback", "simulate", "payment-status-check"]
    }))
}
