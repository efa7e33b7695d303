use axum::{
    extract::State,
    response::Response,
    routing::{get, post},
    Router,
};

use crate::api::errors::ApiError;
use crate::api::params::PathParams;
use crate::api::proxy::{self, Inbound};
use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/practice", post(create_practice))
        .route("/interview", post(create_interview))
        .route("/interview/upload-jd", post(upload_jd))
        .route("/exam", post(create_exam))
        .route("/:id", get(detail))
        .route("/:id/generate-script", post(generate_script))
        .route("/:id/finalize", post(finalize))
}

async fn list(State(state): State<AppState>, inbound: Inbound) -> Response {
    proxy::forward(&state, inbound, "sessions.list", "/api/sessions".into(), "Failed to get sessions")
        .await
}

async fn create_practice(State(state): State<AppState>, inbound: Inbound) -> Response {
    proxy::forward(
        &state,
        inbound,
        "sessions.practice",
        "/api/sessions/practice".into(),
        "Failed to create practice session",
    )
    .await
}

async fn create_interview(State(state): State<AppState>, inbound: Inbound) -> Response {
    proxy::forward(
        &state,
        inbound,
        "sessions.interview",
        "/api/sessions/interview".into(),
        "Failed to create interview session",
    )
    .await
}

async fn upload_jd(State(state): State<AppState>, inbound: Inbound) -> Response {
    proxy::forward(
        &state,
        inbound,
        "sessions.upload_jd",
        "/api/sessions/interview/upload-jd".into(),
        "Failed to upload job description",
    )
    .await
}

async fn create_exam(State(state): State<AppState>, inbound: Inbound) -> Response {
    proxy::forward(
        &state,
        inbound,
        "sessions.exam",
        "/api/sessions/exam".into(),
        "Failed to create exam session",
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
        "session_id",
        "sessions.detail",
        |id| format!("/api/sessions/{id}"),
        "Failed to get session",
    )
    .await
}

async fn generate_script(
    State(state): State<AppState>,
    params: PathParams,
    inbound: Inbound,
) -> Result<Response, ApiError> {
    proxy::forward_with_id(
        &state,
        params,
        inbound,
        "session_id",
        "sessions.generate_script",
        |id| format!("/api/sessions/{id}/generate-script"),
        "Failed to generate script",
    )
    .await
}

async fn finalize(
    State(state): State<AppState>,
    params: PathParams,
    inbound: Inbound,
) -> Result<Response, ApiError> {
    proxy::forward_with_id(
        &state,
        params,
        inbound,
        "session_id",
        "sessions.finalize",
        |id| format!("/api/sessions/{id}/finalize"),
        "Failed to finalize session",
    )
    .await
}
