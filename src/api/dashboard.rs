use axum::{extract::State, response::Response, routing::get, Router};

use crate::api::errors::ApiError;
use crate::api::params::PathParams;
use crate::api::proxy::{self, Inbound};
use crate::core::state::AppState;

// The backend registers its dashboard blueprint at the API root, so the
// `/dashboard` segment is dropped when forwarding.
pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/students/:id", get(student))
        .route("/lecturers/:id", get(lecturer))
}

async fn student(
    State(state): State<AppState>,
    params: PathParams,
    inbound: Inbound,
) -> Result<Response, ApiError> {
    proxy::forward_with_id(
        &state,
        params,
        inbound,
        "student_id",
        "dashboard.student",
        |id| format!("/api/students/{id}"),
        "Failed to get student dashboard",
    )
    .await
}

async fn lecturer(
    State(state): State<AppState>,
    params: PathParams,
    inbound: Inbound,
) -> Result<Response, ApiError> {
    proxy::forward_with_id(
        &state,
        params,
        inbound,
        "lecturer_id",
        "dashboard.lecturer",
        |id| format!("/api/lecturers/{id}"),
        "Failed to get lecturer dashboard",
    )
    .await
}
