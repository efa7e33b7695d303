use std::collections::HashMap;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::core::metrics;
use crate::core::state::AppState;
use crate::schemas::{HealthResponse, RootResponse};

pub(crate) async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let response = RootResponse {
        message: "iView BFF".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        base_path: state.settings().backend().base_path.clone(),
    };

    Json(response)
}

pub(crate) async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut status = "healthy".to_string();
    let mut components = HashMap::new();

    match state.backend().ping().await {
        Ok(code) => {
            components.insert("backend".to_string(), format!("reachable ({})", code.as_u16()));
        }
        Err(err) => {
            components.insert("backend".to_string(), format!("unreachable: {err}"));
            status = "degraded".to_string();
        }
    }

    Json(HealthResponse { service: "iview-bff".to_string(), status, components })
}

pub(crate) async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    if !state.settings().telemetry().prometheus_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }

    match metrics::render() {
        Some(body) => ([(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
            .into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}
