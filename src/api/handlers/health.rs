use axum::{extract::State, http::StatusCode, response::IntoResponse, response::Json};
use std::sync::Arc;

use super::AppState;
use crate::api::models::HealthResponse;
use crate::database;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = database::get_connection(&state.pool).is_ok();
    let status = if database { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (
        status,
        Json(HealthResponse {
            status: if database { "ok" } else { "degraded" },
            database,
        }),
    )
}
