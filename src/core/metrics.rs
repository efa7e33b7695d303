use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

/// Records one forwarded call to the grading backend.
pub(crate) fn record_backend_call(route: &'static str, outcome: &str, seconds: f64) {
    metrics::counter!(
        "backend_requests_total",
        "route" => route,
        "outcome" => outcome.to_string()
    )
    .increment(1);
    metrics::histogram!("backend_request_duration_seconds", "route" => route).record(seconds);
}
