//! Decision service handlers
//!
//! Every failure is rendered as the same `{"success": false, "error": ...}`
//! object the CLI prints, with the status chosen by [`ErrorKind`].

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::conflicts::Conflict;
use crate::error::{ArbiterError, ErrorKind};
use crate::formatter::{DecisionResponse, FailureResponse};
use crate::pipeline::Arbiter;
use crate::types::{TrainRecord, TrainRef};

/// Shared service state: the read-only arbiter.
pub type ApiState = Arc<Arbiter>;

// ============================================================================
// Error mapping
// ============================================================================

/// An [`ArbiterError`] on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub ArbiterError);

impl From<ArbiterError> for ApiError {
    fn from(e: ArbiterError) -> Self {
        Self(e)
    }
}

pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InputParse | ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Lookup => StatusCode::NOT_FOUND,
        ErrorKind::Model => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.kind());
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Decision failed");
        } else {
            tracing::debug!(error = %self.0, "Request rejected");
        }
        (status, Json(FailureResponse::new(&self.0))).into_response()
    }
}

// ============================================================================
// POST /ai-suggest
// ============================================================================

/// POST /ai-suggest - arbitrate one conflict
///
/// The body is parsed here rather than by the `Json` extractor so malformed
/// input gets the standard failure object.
pub async fn ai_suggest(
    State(arbiter): State<ApiState>,
    body: Bytes,
) -> Result<Json<DecisionResponse>, ApiError> {
    let raw = std::str::from_utf8(&body)
        .map_err(|e| ArbiterError::InputParse(format!("body is not UTF-8: {e}")))?;
    Ok(Json(arbiter.evaluate(raw)?))
}

// ============================================================================
// GET /health
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
    /// Classifier name, when loaded
    pub model: Option<String>,
    pub schedule_loaded: bool,
    pub schedule_trains: usize,
    pub timestamp: DateTime<Utc>,
}

/// GET /health - artifact status
pub async fn get_health(State(arbiter): State<ApiState>) -> Json<HealthResponse> {
    let model = arbiter.classifier_name().map(str::to_string);
    Json(HealthResponse {
        status: "ok",
        model_loaded: model.is_some(),
        model,
        schedule_loaded: arbiter.schedule().is_some(),
        schedule_trains: arbiter.schedule().map_or(0, |s| s.len()),
        timestamp: Utc::now(),
    })
}

// ============================================================================
// GET /trains/:id
// ============================================================================

#[derive(Debug, Serialize)]
pub struct TrainResponse {
    pub success: bool,
    pub train: TrainRecord,
}

/// GET /trains/:id - schedule lookup
pub async fn get_train(
    State(arbiter): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<TrainResponse>, ApiError> {
    let record = arbiter.lookup(&TrainRef::Text(id))?;
    Ok(Json(TrainResponse {
        success: true,
        train: record.clone(),
    }))
}

// ============================================================================
// GET /conflicts
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ConflictsResponse {
    pub success: bool,
    pub count: usize,
    pub conflicts: Vec<Conflict>,
}

/// GET /conflicts - scan the loaded schedule
pub async fn get_conflicts(
    State(arbiter): State<ApiState>,
) -> Result<Json<ConflictsResponse>, ApiError> {
    let conflicts = arbiter.scan()?;
    Ok(Json(ConflictsResponse {
        success: true,
        count: conflicts.len(),
        conflicts,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(status_for(ErrorKind::InputParse), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::Validation), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::Lookup), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::Model), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
