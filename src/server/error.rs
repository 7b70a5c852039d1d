//! JSON error responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::adapters::TrackerError;
use crate::core::{ReconcileError, SubmissionError};

/// Error body: `{success: false, error, quotaExceeded?}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    quota_exceeded: Option<bool>,
}

/// An error returned by a route handler
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    quota_exceeded: bool,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            quota_exceeded: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<SubmissionError> for ApiError {
    fn from(e: SubmissionError) -> Self {
        Self {
            status: StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            quota_exceeded: e.is_quota(),
            message: e.to_string(),
        }
    }
}

impl From<ReconcileError> for ApiError {
    fn from(e: ReconcileError) -> Self {
        SubmissionError::from(e).into()
    }
}

impl From<TrackerError> for ApiError {
    fn from(e: TrackerError) -> Self {
        SubmissionError::Tracker(e).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
            quota_exceeded: false,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: self.message,
            quota_exceeded: self.quota_exceeded.then_some(true),
        };
        (self.status, Json(body)).into_response()
    }
}
