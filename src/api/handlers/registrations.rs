use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
};
use std::sync::Arc;

use super::{blocking, caller_id, AppState};
use crate::api::models::VerifyPaymentRequest;
use crate::domain::Registration;
use crate::errors::EngineResult;

pub async fn verify_payment(
    State(state): State<Arc<AppState>>,
    Path(registration_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<VerifyPaymentRequest>,
) -> EngineResult<Json<Registration>> {
    let caller = caller_id(&headers);
    let service = state.payments.clone();

    let updated = blocking(move || {
        service.verify(
            &registration_id,
            caller.as_deref(),
            request.approved,
            request.notes.as_deref(),
        )
    })
    .await?;

    Ok(Json(updated))
}
