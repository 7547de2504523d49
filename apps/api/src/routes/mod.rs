pub mod health;

use axum::{routing::get, Router};

use crate::session::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/", get(handlers::handle_index).post(handlers::handle_submit))
        .route("/api/contacts", get(handlers::handle_list_contacts))
        .route("/api/map", get(handlers::handle_map_points))
        .fallback(handlers::handle_not_found)
        .with_state(state)
}
