use axum::{middleware, routing::get, Router};

use crate::handlers::profile_handlers;
use crate::middleware::auth::auth_middleware;
use crate::state::AppState;

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(profile_handlers::get_profile).put(profile_handlers::update_profile),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}
