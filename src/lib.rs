pub(crate) mod api;
pub mod client;
pub(crate) mod core;
pub(crate) mod schemas;
pub(crate) mod services;
pub mod views;

#[cfg(test)]
mod test_support;

use crate::core::{config::Settings, state::AppState, telemetry};
use crate::services::backend::BackendClient;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let backend = BackendClient::from_settings(&settings)?;
    let state = AppState::new(settings, backend);

    if let Err(err) = state.backend().ping().await {
        tracing::warn!(error = %err, "Backend not reachable at startup; serving anyway");
    }

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        backend = %state.settings().backend().base_url,
        base_path = %state.settings().backend().base_path,
        environment = %state.settings().runtime().environment.as_str(),
        "iView BFF listening"
    );

    axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await?;

    tracing::info!("iView BFF stopped");
    Ok(())
}
