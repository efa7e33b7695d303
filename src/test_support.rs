use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;

use crate::api;
use crate::core::{config::Settings, state::AppState};
use crate::services::backend::BackendClient;

const CONFIG_KEYS: &[&str] = &[
    "IVIEW_HOST",
    "IVIEW_PORT",
    "PORT",
    "IVIEW_ENV",
    "NODE_ENV",
    "BACKEND_URL",
    "NEXT_PUBLIC_API_URL",
    "BACKEND_HOST",
    "BACKEND_PORT",
    "BASE_PATH",
    "NEXT_PUBLIC_BASE_PATH",
    "BACKEND_TIMEOUT_SECONDS",
    "BACKEND_CONNECT_TIMEOUT_SECONDS",
    "EVALUATION_TIMEOUT_SECONDS",
    "BACKEND_CORS_ORIGINS",
    "LOG_LEVEL",
    "LOG_JSON",
    "PROMETHEUS_ENABLED",
];

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn clear_config_env() {
    for key in CONFIG_KEYS {
        std::env::remove_var(key);
    }
}

/// Loads settings pointing at `backend_url`. Callers must hold [`env_lock`].
pub(crate) fn settings_for(backend_url: &str) -> Settings {
    settings_with(backend_url, &[])
}

pub(crate) fn settings_with(backend_url: &str, overrides: &[(&str, &str)]) -> Settings {
    clear_config_env();
    std::env::set_var("IVIEW_ENV", "test");
    std::env::set_var("BACKEND_URL", backend_url);
    for (key, value) in overrides {
        std::env::set_var(key, value);
    }
    let settings = Settings::load().expect("settings");
    clear_config_env();
    settings
}

pub(crate) fn state_for(settings: Settings) -> AppState {
    let backend = BackendClient::from_settings(&settings).expect("backend client");
    AppState::new(settings, backend)
}

pub(crate) fn app_for(backend_url: &str) -> Router {
    api::router::router(state_for(settings_for(backend_url)))
}

/// In-process stand-in for the grading backend, bound to an ephemeral port.
pub(crate) struct MockBackend {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl MockBackend {
    pub(crate) async fn start(router: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind mock");
        let addr = listener.local_addr().expect("mock addr");
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.expect("mock backend");
        });
        Self { addr, handle }
    }

    pub(crate) fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}
