use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
};
use std::sync::Arc;

use super::{blocking, caller_id, AppState};
use crate::errors::EngineResult;
use crate::services::brackets::{BracketView, GenerationSummary};

pub async fn generate_bracket(
    State(state): State<Arc<AppState>>,
    Path(tournament_id): Path<String>,
    headers: HeaderMap,
) -> EngineResult<Json<GenerationSummary>> {
    let caller = caller_id(&headers);
    let service = state.brackets.clone();

    let summary = blocking(move || service.generate(&tournament_id, caller.as_deref())).await?;
    Ok(Json(summary))
}

pub async fn get_bracket(
    State(state): State<Arc<AppState>>,
    Path(tournament_id): Path<String>,
) -> EngineResult<Json<BracketView>> {
    let service = state.brackets.clone();

    let view = blocking(move || service.view(&tournament_id)).await?;
    Ok(Json(view))
}
