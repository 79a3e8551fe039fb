use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
};
use log::error;
use std::sync::Arc;

use super::{blocking, caller_id, AppState};
use crate::api::models::RecordResultRequest;
use crate::domain::Match;
use crate::errors::EngineResult;

pub async fn record_result(
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<RecordResultRequest>,
) -> EngineResult<Json<Match>> {
    let caller = caller_id(&headers);
    let service = state.results.clone();

    let recorded = blocking(move || {
        service.record(&match_id, caller.as_deref(), request.winner, request.scores)
    })
    .await?;

    // The result is stored either way; a reconcile run re-delivers the event.
    if let Err(e) = state.queue.publish(recorded.id.as_str()).await {
        error!("Could not queue progression for match {}: {:#}", recorded.id, e);
    }

    Ok(Json(recorded))
}
