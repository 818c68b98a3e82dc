//! Error-to-HTTP response conversion.
//!
//! Handlers return `Result<T, AppError>`; the wrapped
//! [`camstation_common::Error`] picks the status code and the `code` field.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use camstation_av::AvError;
use serde_json::json;

use crate::recording::RecordingError;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: camstation_common::Error,
}

impl AppError {
    pub fn new(inner: camstation_common::Error) -> Self {
        Self { inner }
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(camstation_common::Error::Unauthorized(msg.into()))
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(camstation_common::Error::Forbidden(msg.into()))
    }

    pub fn inner(&self) -> &camstation_common::Error {
        &self.inner
    }
}

impl From<camstation_common::Error> for AppError {
    fn from(e: camstation_common::Error) -> Self {
        Self::new(e)
    }
}

impl From<RecordingError> for AppError {
    fn from(e: RecordingError) -> Self {
        Self::new(e.into())
    }
}

impl From<AvError> for AppError {
    fn from(e: AvError) -> Self {
        Self::new(e.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in API handler"
            );
        }

        let body = json!({
            "error": self.inner.to_string(),
            "code": self.inner.code(),
        });

        (status, axum::Json(body)).into_response()
    }
}
