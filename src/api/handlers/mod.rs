use axum::http::HeaderMap;

use crate::database::DbPool;
use crate::errors::{EngineError, EngineResult};
use crate::services::{BracketService, PaymentService, ProgressionQueue, ResultService};

pub mod brackets;
pub mod health;
pub mod matches;
pub mod registrations;

pub const CALLER_HEADER: &str = "x-user-id";

pub struct AppState {
    pub pool: DbPool,
    pub brackets: BracketService,
    pub results: ResultService,
    pub payments: PaymentService,
    pub queue: ProgressionQueue,
}

/// Caller identity as forwarded by the authenticating proxy.
pub fn caller_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CALLER_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
}

/// Runs store-bound service work off the async executor.
pub async fn blocking<T, F>(work: F) -> EngineResult<T>
where
    F: FnOnce() -> EngineResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| EngineError::Store(e.into()))?
}
