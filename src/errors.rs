use crate::services::{site_service::SiteError, upload_service::UploadError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

/// Upload pipeline errors map onto client-visible statuses. I/O faults are
/// logged in full but surfaced as an opaque 500 — no path detail leaves the
/// process.
impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        let status = match &err {
            UploadError::MissingFile
            | UploadError::WrongExtension { .. }
            | UploadError::SizeExceeded { .. }
            | UploadError::InvalidIdentifier
            | UploadError::Extraction(_)
            | UploadError::PathEscape => StatusCode::BAD_REQUEST,
            UploadError::Sanitization(_) => StatusCode::UNPROCESSABLE_ENTITY,
            UploadError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("upload failed: {err}");
            return AppError::internal("internal storage error");
        }
        AppError::new(status, err.to_string())
    }
}

impl From<SiteError> for AppError {
    fn from(err: SiteError) -> Self {
        match &err {
            SiteError::SiteNotFound(_) => AppError::not_found(err.to_string()),
            SiteError::SubdomainTaken(_) => AppError::new(StatusCode::CONFLICT, err.to_string()),
            SiteError::InvalidSubdomain { .. } => {
                AppError::new(StatusCode::BAD_REQUEST, err.to_string())
            }
            SiteError::Sqlx(_) | SiteError::Io(_) => {
                tracing::error!("site operation failed: {err}");
                AppError::internal("internal storage error")
            }
        }
    }
}
