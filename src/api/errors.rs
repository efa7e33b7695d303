use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub(crate) const BACKEND_UNREACHABLE: &str = "Failed to connect to backend server";

/// Body shape shared with the grading backend: `{ "error": "..." }`.
#[derive(Debug, Serialize)]
pub(crate) struct ErrorBody {
    pub(crate) error: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    BadRequest(String),
    Unauthorized(&'static str),
    GatewayTimeout(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    pub(crate) fn missing_param(label: &str) -> Self {
        Self::BadRequest(format!("{label} is required"))
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Unauthorized(message) => {
                let mut response =
                    (status, Json(ErrorBody { error: message.to_string() })).into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            ApiError::GatewayTimeout(message) => {
                tracing::warn!(error = %message, "Backend call timed out");
                (status, Json(ErrorBody { error: message })).into_response()
            }
            ApiError::BadRequest(message) | ApiError::Internal(message) => {
                (status, Json(ErrorBody { error: message })).into_response()
            }
        }
    }
}
