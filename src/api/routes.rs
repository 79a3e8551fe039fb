use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::api::handlers::{
    brackets::{generate_bracket, get_bracket},
    health::health,
    matches::record_result,
    registrations::verify_payment,
    AppState,
};

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/tournaments/:id/bracket", post(generate_bracket).get(get_bracket))
        .route("/api/matches/:id/result", post(record_result))
        .route("/api/registrations/:id/verify", post(verify_payment))
        .with_state(state)
}
