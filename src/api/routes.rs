//! Route definitions: maps URLs to handlers.

use super::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Liveness
        .route("/health", get(health_handler))
        // Oracle signing protocol
        .route("/sign", post(sign_handler))
        .route("/resolve", post(resolve_handler))
        // Room reads
        .route("/rooms", get(rooms_handler))
        .route("/room/:id", get(room_view_handler))
        // Rewards ledger
        .route("/rewards", get(rewards_handler).post(claim_handler))
        .with_state(state)
}
