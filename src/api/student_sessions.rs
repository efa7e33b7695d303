use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};

use crate::api::errors::ApiError;
use crate::api::params::PathParams;
use crate::api::proxy::{self, Inbound};
use crate::core::state::AppState;
use crate::services::backend::BackendError;

pub(crate) const EVALUATION_TIMEOUT_MESSAGE: &str =
    "Request timeout. Evaluation is taking longer than expected. Please check results later.";

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/join", post(join))
        .route("/:id", get(detail))
        .route("/:id/start", post(start))
        .route("/:id/question", get(next_question))
        .route("/:id/answer", post(submit_answer))
        .route("/:id/end", post(end_session))
}

async fn join(State(state): State<AppState>, inbound: Inbound) -> Response {
    proxy::forward(
        &state,
        inbound,
        "student_sessions.join",
        "/api/student-sessions/join".into(),
        "Failed to join session",
    )
    .await
}

async fn detail(
    State(state): State<AppState>,
    params: PathParams,
    inbound: Inbound,
) -> Result<Response, ApiError> {
    proxy::forward_with_id(
        &state,
        params,
        inbound,
        "student_session_id",
        "student_sessions.detail",
        |id| format!("/api/student-sessions/{id}"),
        "Failed to get student session",
    )
    .await
}

async fn start(
    State(state): State<AppState>,
    params: PathParams,
    inbound: Inbound,
) -> Result<Response, ApiError> {
    proxy::forward_with_id(
        &state,
        params,
        inbound,
        "student_session_id",
        "student_sessions.start",
        |id| format!("/api/student-sessions/{id}/start"),
        "Failed to start session",
    )
    .await
}

async fn next_question(
    State(state): State<AppState>,
    params: PathParams,
    inbound: Inbound,
) -> Result<Response, ApiError> {
    proxy::forward_with_id(
        &state,
        params,
        inbound,
        "student_session_id",
        "student_sessions.question",
        |id| format!("/api/student-sessions/{id}/question"),
        "Failed to get question",
    )
    .await
}

async fn submit_answer(
    State(state): State<AppState>,
    params: PathParams,
    inbound: Inbound,
) -> Result<Response, ApiError> {
    proxy::forward_with_id(
        &state,
        params,
        inbound,
        "student_session_id",
        "student_sessions.answer",
        |id| format!("/api/student-sessions/{id}/answer"),
        "Failed to submit answer",
    )
    .await
}

/// Ends the session, which makes the backend grade every answer in one go.
/// Bounded by the evaluation timeout so the browser always gets an answer.
async fn end_session(
    State(state): State<AppState>,
    params: PathParams,
    inbound: Inbound,
) -> Result<Response, ApiError> {
    let params = params.resolve().await;
    let id = params.require("id", "student_session_id")?;
    let timeout = state.settings().backend().evaluation_timeout;

    let request = inbound
        .into_backend("student_sessions.end", format!("/api/student-sessions/{id}/end"))
        .timeout(timeout);

    match state.backend().send(request).await {
        Ok(reply) => Ok(proxy::relay(reply, "Failed to end session")),
        Err(BackendError::Timeout(_)) => {
            tracing::warn!(
                student_session_id = %id,
                timeout_secs = timeout.as_secs(),
                "Evaluation exceeded timeout"
            );
            Ok(ApiError::GatewayTimeout(EVALUATION_TIMEOUT_MESSAGE.to_string()).into_response())
        }
        Err(err) => Err(proxy::backend_failure(err)),
    }
}
