// src/api/mod.rs

use axum::routing::{get, post};
use axum::{middleware, Router};
use std::sync::Arc;

use crate::AppState;

pub mod auth;
pub mod error;
pub mod handlers;

/// `/bid` 需要鉴权，`/health` 不需要
pub fn router(state: Arc<AppState>) -> Router {
    let bid_routes = Router::new()
        .route("/bid", post(handlers::handle_bid))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_bearer));

    Router::new()
        .merge(bid_routes)
        .route("/health", get(handlers::health_handler))
        .with_state(state)
}
