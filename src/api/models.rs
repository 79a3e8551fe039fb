use serde::{Deserialize, Serialize};

use crate::domain::{Scores, Side};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResultRequest {
    pub winner: Side,
    pub scores: Option<Scores>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    pub approved: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
}
