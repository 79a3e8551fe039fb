use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use log::error;

use crate::api::models::ErrorBody;
use crate::errors::EngineError;

pub fn status_for(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Authentication => StatusCode::UNAUTHORIZED,
        EngineError::Authorization(_) => StatusCode::FORBIDDEN,
        EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
        EngineError::InvalidState(_) => StatusCode::CONFLICT,
        EngineError::Precondition(_) => StatusCode::PRECONDITION_FAILED,
        EngineError::Integrity(_) | EngineError::Sqlite(_) | EngineError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            error!("Request failed [{}]: {:#}", self.kind(), self);
        }

        let body = ErrorBody {
            error: self.kind().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
