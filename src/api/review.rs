use axum::{
    extract::State,
    response::Response,
    routing::{get, put},
    Router,
};

use crate::api::errors::ApiError;
use crate::api::params::PathParams;
use crate::api::proxy::{self, Inbound};
use crate::core::state::AppState;
use crate::schemas::question::OverallFeedback;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/sessions", get(sessions))
        .route("/sessions/:id/students", get(session_students))
        .route("/student-sessions/:id", get(student_session))
        .route("/student-sessions/:id/overall", put(overall_feedback))
        .route("/answers/:id/score", put(answer_score))
        .route("/answers/:id/feedback", put(answer_feedback))
}

async fn sessions(State(state): State<AppState>, inbound: Inbound) -> Response {
    proxy::forward(
        &state,
        inbound,
        "review.sessions",
        "/api/review/sessions".into(),
        "Failed to get review sessions",
    )
    .await
}

async fn session_students(
    State(state): State<AppState>,
    params: PathParams,
    inbound: Inbound,
) -> Result<Response, ApiError> {
    proxy::forward_with_id(
        &state,
        params,
        inbound,
        "session_id",
        "review.session_students",
        |id| format!("/api/review/sessions/{id}/students"),
        "Failed to get session students",
    )
    .await
}

async fn student_session(
    State(state): State<AppState>,
    params: PathParams,
    inbound: Inbound,
) -> Result<Response, ApiError> {
    proxy::forward_with_id(
        &state,
        params,
        inbound,
        "student_session_id",
        "review.student_session",
        |id| format!("/api/review/student-sessions/{id}"),
        "Failed to get student session detail",
    )
    .await
}

async fn overall_feedback(
    State(state): State<AppState>,
    params: PathParams,
    inbound: Inbound,
) -> Result<Response, ApiError> {
    let params = params.resolve().await;
    let id = params.require("id", "student_session_id")?;

    let payload: OverallFeedback = serde_json::from_slice(&inbound.body)
        .map_err(|_| ApiError::BadRequest("Invalid JSON body".to_string()))?;
    if payload.lecturer_feedback.as_deref().map_or(true, |value| value.trim().is_empty()) {
        return Err(ApiError::missing_param("lecturer_feedback"));
    }

    Ok(proxy::forward(
        &state,
        inbound,
        "review.overall",
        format!("/api/review/student-sessions/{id}/overall"),
        "Failed to update overall feedback",
    )
    .await)
}

async fn answer_score(
    State(state): State<AppState>,
    params: PathParams,
    inbound: Inbound,
) -> Result<Response, ApiError> {
    proxy::forward_with_id(
        &state,
        params,
        inbound,
        "answer_id",
        "review.answer_score",
        |id| format!("/api/review/answers/{id}/score"),
        "Failed to update answer score",
    )
    .await
}

async fn answer_feedback(
    State(state): State<AppState>,
    params: PathParams,
    inbound: Inbound,
) -> Result<Response, ApiError> {
    proxy::forward_with_id(
        &state,
        params,
        inbound,
        "answer_id",
        "review.answer_feedback",
        |id| format!("/api/review/answers/{id}/feedback"),
        "Failed to update answer feedback",
    )
    .await
}
