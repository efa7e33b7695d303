use axum::{
    extract::State,
    response::Response,
    routing::{delete, get, post},
    Router,
};

use crate::api::errors::ApiError;
use crate::api::params::PathParams;
use crate::api::proxy::{self, Inbound};
use crate::core::state::AppState;

/// Uploads travel as raw multipart bodies; the boundary in the inbound
/// `Content-Type` is forwarded unchanged.
pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/upload-cv", post(upload_cv))
        .route("/upload-material", post(upload_material))
        .route("/materials", get(list))
        .route("/materials/:id", delete(remove))
}

async fn upload_cv(State(state): State<AppState>, inbound: Inbound) -> Response {
    proxy::forward(&state, inbound, "materials.upload_cv", "/api/upload-cv".into(), "Failed to upload CV")
        .await
}

async fn upload_material(State(state): State<AppState>, inbound: Inbound) -> Response {
    proxy::forward(
        &state,
        inbound,
        "materials.upload",
        "/api/upload-material".into(),
        "Failed to upload material",
    )
    .await
}

async fn list(State(state): State<AppState>, inbound: Inbound) -> Response {
    proxy::forward(&state, inbound, "materials.list", "/api/materials".into(), "Failed to get materials")
        .await
}

async fn remove(
    State(state): State<AppState>,
    params: PathParams,
    inbound: Inbound,
) -> Result<Response, ApiError> {
    proxy::forward_with_id(
        &state,
        params,
        inbound,
        "material_id",
        "materials.delete",
        |id| format!("/api/materials/{id}"),
        "Failed to delete material",
    )
    .await
}
