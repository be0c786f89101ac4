use axum::{extract::State, http::Method, response::Json, routing::get, Router};
use mongodb::bson::doc;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

pub mod market;
pub mod payments;
pub mod profile;

pub fn app(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .allow_credentials(false);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .route("/api/health", get(api_health_check))
        .nest("/api/payments", payments::payment_routes())
        .nest("/api/market", market::market_routes())
        .nest("/api/profile", profile::profile_routes())
        .layer(cors)
        .with_state(app_state)
}

async fn root_handler() -> &'static str {
    "🌱 Shamba Farm Market API"
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn api_health_check(State(state): State<AppState>) -> Json<Value> {
    let db_status = match state.db.run_command(doc! {"ping": 1}, None).await {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    Json(json!({
        "status": "healthy",
        "database": db_status,
        "payhero": state.payhero_service.is_some(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
