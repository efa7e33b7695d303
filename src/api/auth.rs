use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};

use crate::api::errors::ApiError;
use crate::api::proxy::{self, Inbound};
use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/user", get(current_user))
}

async fn login(State(state): State<AppState>, inbound: Inbound) -> Response {
    proxy::forward(&state, inbound, "auth.login", "/api/auth/login".into(), "Login failed").await
}

async fn register(State(state): State<AppState>, inbound: Inbound) -> Response {
    proxy::forward(
        &state,
        inbound,
        "auth.register",
        "/api/auth/register".into(),
        "Registration failed",
    )
    .await
}

async fn refresh(State(state): State<AppState>, inbound: Inbound) -> Response {
    proxy::forward(
        &state,
        inbound,
        "auth.refresh",
        "/api/auth/refresh".into(),
        "Failed to refresh token",
    )
    .await
}

async fn logout(State(state): State<AppState>, inbound: Inbound) -> Response {
    proxy::forward(&state, inbound, "auth.logout", "/api/auth/logout".into(), "Logout failed")
        .await
}

async fn current_user(State(state): State<AppState>, inbound: Inbound) -> Response {
    if inbound.authorization.is_none() {
        return ApiError::Unauthorized("Authorization header is required").into_response();
    }

    proxy::forward(&state, inbound, "auth.user", "/api/auth/user".into(), "Failed to get user")
        .await
}
