//! API error types with structured JSON responses.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::core_state::CoreError;
use crate::db::DatabaseError;
use crate::followups::FollowUpError;
use crate::patients::NoteError;
use crate::schedule::ScheduleError;
use crate::voice::VoiceError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("{0} not configured")]
    NotConfigured(String),
    #[error("Upstream provider failed: {0}")]
    Upstream(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail),
            ApiError::Conflict(detail) => (StatusCode::CONFLICT, "CONFLICT", detail),
            ApiError::NotConfigured(what) => {
                tracing::error!(what = %what, "Provider not configured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "NOT_CONFIGURED",
                    format!("{what} not configured"),
                )
            }
            ApiError::Upstream(detail) => {
                tracing::warn!(detail = %detail, "Upstream provider error");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_FAILED",
                    "Upstream provider request failed".to_string(),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::LockPoisoned => ApiError::Internal("lock poisoned".into()),
            CoreError::Database(e) => ApiError::from(e),
            CoreError::Provider(e) => ApiError::from(e),
            CoreError::Note(e) => ApiError::from(e),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity_type, id } => {
                ApiError::NotFound(format!("{entity_type} not found: {id}"))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ScheduleError> for ApiError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::SlotTaken { .. } => ApiError::Conflict(err.to_string()),
            ScheduleError::AppointmentNotFound(_) => ApiError::NotFound(err.to_string()),
            ScheduleError::Database(e) => ApiError::from(e),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<FollowUpError> for ApiError {
    fn from(err: FollowUpError) -> Self {
        match err {
            FollowUpError::PatientNotFound(_) | FollowUpError::FollowUpNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            FollowUpError::Database(e) => ApiError::from(e),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<NoteError> for ApiError {
    fn from(err: NoteError) -> Self {
        match err {
            NoteError::MissingField(_) => ApiError::BadRequest(err.to_string()),
            NoteError::PatientNotFound(_) => ApiError::NotFound(err.to_string()),
            NoteError::Database(e) => ApiError::from(e),
        }
    }
}

impl From<VoiceError> for ApiError {
    fn from(err: VoiceError) -> Self {
        match err {
            VoiceError::NotConfigured(key) => ApiError::NotConfigured(key.to_string()),
            VoiceError::Http(detail) => ApiError::Upstream(detail),
            VoiceError::Upstream { status, body } => {
                ApiError::Upstream(format!("status {status}: {body}"))
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("blocking task failed: {err}"))
    }
}
