use async_trait::async_trait;
use axum::body::{to_bytes, Bytes};
use axum::extract::{FromRequest, Request};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::api::errors::{ApiError, BACKEND_UNREACHABLE};
use crate::api::params::PathParams;
use crate::core::state::AppState;
use crate::services::backend::{BackendError, BackendReply, BackendRequest};

/// Upper bound for a forwarded body; CV and material uploads pass through here.
const MAX_FORWARD_BODY_BYTES: usize = 50 * 1024 * 1024;

const BACKEND_TIMEOUT: &str = "Request to backend timed out. Please try again.";

/// The parts of a browser request that get forwarded to the backend.
#[derive(Debug, Clone)]
pub(crate) struct Inbound {
    pub(crate) method: Method,
    pub(crate) authorization: Option<String>,
    pub(crate) content_type: Option<String>,
    pub(crate) query: Option<String>,
    pub(crate) body: Bytes,
}

#[async_trait]
impl<S> FromRequest<S> for Inbound
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = request.into_parts();
        let header = |name: HeaderName| {
            parts.headers.get(name).and_then(|value| value.to_str().ok()).map(str::to_string)
        };
        let authorization = header(AUTHORIZATION);
        let content_type = header(CONTENT_TYPE);
        let query = parts.uri.query().map(str::to_string);

        let body = to_bytes(body, MAX_FORWARD_BODY_BYTES)
            .await
            .map_err(|err| ApiError::BadRequest(format!("Failed to read request body: {err}")))?;

        Ok(Self { method: parts.method, authorization, content_type, query, body })
    }
}

impl Inbound {
    /// Same method, query, credentials and body, aimed at `path` on the backend.
    pub(crate) fn into_backend(self, route: &'static str, path: String) -> BackendRequest {
        BackendRequest::new(route, self.method, path)
            .query(self.query)
            .authorization(self.authorization)
            .body(self.content_type, self.body)
    }
}

/// Forwards `inbound` to `path` and relays whatever the backend answered.
pub(crate) async fn forward(
    state: &AppState,
    inbound: Inbound,
    route: &'static str,
    path: String,
    fallback: &'static str,
) -> Response {
    let request = inbound.into_backend(route, path);
    match state.backend().send(request).await {
        Ok(reply) => relay(reply, fallback),
        Err(err) => backend_failure(err).into_response(),
    }
}

/// Resolves the `id` path segment, then forwards to the path built from it.
pub(crate) async fn forward_with_id(
    state: &AppState,
    params: PathParams,
    inbound: Inbound,
    label: &str,
    route: &'static str,
    path: impl FnOnce(&str) -> String,
    fallback: &'static str,
) -> Result<Response, ApiError> {
    let params = params.resolve().await;
    let id = params.require("id", label)?;
    Ok(forward(state, inbound, route, path(id), fallback).await)
}

/// Status code verbatim; JSON bodies verbatim, anything else wrapped as
/// `{ "error": <text> }`.
pub(crate) fn relay(reply: BackendReply, fallback: &str) -> Response {
    let body = decode_body(&reply.body, reply.status, fallback);
    (reply.status, Json(body)).into_response()
}

pub(crate) fn decode_body(body: &[u8], status: StatusCode, fallback: &str) -> Value {
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        return value;
    }

    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() && status.is_success() {
        return json!({});
    }

    let message = if text.is_empty() { fallback.to_string() } else { text };
    json!({ "error": message })
}

pub(crate) fn backend_failure(err: BackendError) -> ApiError {
    match err {
        BackendError::Timeout(_) => ApiError::GatewayTimeout(BACKEND_TIMEOUT.to_string()),
        BackendError::Connect(_) | BackendError::Transport(_) => {
            ApiError::internal(err, BACKEND_UNREACHABLE)
        }
    }
}
