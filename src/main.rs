use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;

use shamba_api::config::PayheroConfig;
use shamba_api::database::connection::get_db_client;
use shamba_api::routes;
use shamba_api::services::payhero_service::PayheroService;
use shamba_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let db = get_db_client().await;
    let app_state = initialize_app_state(db);

    let app = routes::app(app_state);
    start_server(app).await;
}

fn initialize_app_state(db: mongodb::Database) -> AppState {
    let mut app_state = AppState::new(db);

    tracing::info!("🔧 Attempting to initialize PayHero service...");

    match PayheroConfig::from_env() {
        Ok(config) => {
            tracing::info!("📱 Channel: {}", config.channel_id);
            tracing::info!("🌐 Callback URL: {}", config.callback_url);
            app_state = app_state.with_payhero(Arc::new(PayheroService::new(config)));
            tracing::info!("✅ PayHero service initialized and ready");
        }
        Err(e) => {
            tracing::error!("❌ Failed to load PayHero config: {}", e);
            tracing::warn!("Payment initiation will be disabled");
        }
    }

    app_state
}

async fn start_server(app: Router) {
    let port = std::env::var("PORT").unwrap_or_else(|_| "10000".to_string());
    let addr = SocketAddr::from(([0, 0, 0, 0], port.parse().unwrap_or(10000)));

    tracing::info!("🚀 Server starting on {}", addr);

    match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Server error: {}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    }
}
