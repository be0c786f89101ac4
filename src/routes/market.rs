use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::handlers::market_handlers;
use crate::middleware::auth::auth_middleware;
use crate::state::AppState;

pub fn market_routes() -> Router<AppState> {
    let protected = Router::new()
        .route("/listings", post(market_handlers::create_listing))
        .route("/prices", get(market_handlers::get_market_prices))
        .route_layer(middleware::from_fn(auth_middleware));

    Router::new()
        .route("/listings", get(market_handlers::get_listings))
        .merge(protected)
}
