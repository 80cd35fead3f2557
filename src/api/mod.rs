//! Read-only HTTP query surface over the persisted ledger.

pub mod collaterals;
pub mod conditions;
pub mod health;
pub mod positions;
pub mod users;

use crate::db::Repository;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/conditions/:id", get(conditions::get_condition))
        .route("/v1/collections/:id", get(positions::get_collection))
        .route("/v1/positions/:id", get(positions::get_position))
        .route("/v1/users/:address", get(users::get_user))
        .route("/v1/users/:address/positions", get(users::get_user_positions))
        .route("/v1/collaterals/:address", get(collaterals::get_collateral))
        .layer(cors)
        .with_state(state)
}
