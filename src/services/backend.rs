use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::body::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use thiserror::Error;

use crate::core::config::Settings;
use crate::core::metrics;

/// HTTP client for the grading backend. Every BFF route goes through
/// [`BackendClient::send`].
#[derive(Debug, Clone)]
pub(crate) struct BackendClient {
    client: Client,
    base_url: String,
    request_timeout: Option<Duration>,
    connect_timeout: Duration,
}

/// One call to forward. Bodies are kept as raw bytes so JSON and multipart
/// uploads pass through untouched.
#[derive(Debug, Clone)]
pub(crate) struct BackendRequest {
    route: &'static str,
    method: Method,
    path: String,
    query: Option<String>,
    authorization: Option<String>,
    content_type: Option<String>,
    body: Bytes,
    timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub(crate) struct BackendReply {
    pub(crate) status: StatusCode,
    pub(crate) body: Bytes,
}

#[derive(Debug, Error)]
pub(crate) enum BackendError {
    #[error("backend did not answer within {0:?}")]
    Timeout(Duration),
    #[error("failed to connect to backend: {0}")]
    Connect(String),
    #[error("backend request failed: {0}")]
    Transport(String),
}

impl BackendRequest {
    pub(crate) fn new(route: &'static str, method: Method, path: impl Into<String>) -> Self {
        Self {
            route,
            method,
            path: path.into(),
            query: None,
            authorization: None,
            content_type: None,
            body: Bytes::new(),
            timeout: None,
        }
    }

    pub(crate) fn query(mut self, query: Option<String>) -> Self {
        self.query = query.filter(|value| !value.is_empty());
        self
    }

    pub(crate) fn authorization(mut self, value: Option<String>) -> Self {
        self.authorization = value;
        self
    }

    pub(crate) fn body(mut self, content_type: Option<String>, body: Bytes) -> Self {
        self.content_type = content_type;
        self.body = body;
        self
    }

    pub(crate) fn json<T: Serialize>(self, payload: &T) -> Result<Self, serde_json::Error> {
        let bytes = serde_json::to_vec(payload)?;
        Ok(self.body(Some("application/json".to_string()), Bytes::from(bytes)))
    }

    pub(crate) fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl BackendClient {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let backend = settings.backend();
        let client = Client::builder()
            .connect_timeout(backend.connect_timeout)
            .build()
            .context("Failed to build backend HTTP client")?;

        Ok(Self {
            client,
            base_url: backend.base_url.clone(),
            request_timeout: backend.request_timeout,
            connect_timeout: backend.connect_timeout,
        })
    }

    pub(crate) fn url_for(&self, path: &str, query: Option<&str>) -> String {
        match query {
            Some(query) => format!("{}{}?{}", self.base_url, path, query),
            None => format!("{}{}", self.base_url, path),
        }
    }

    pub(crate) async fn send(&self, request: BackendRequest) -> Result<BackendReply, BackendError> {
        let url = self.url_for(&request.path, request.query.as_deref());
        let timeout = request.timeout.or(self.request_timeout);
        let content_type = request.content_type.as_deref().unwrap_or("application/json");

        let mut builder =
            self.client.request(request.method.clone(), &url).header(CONTENT_TYPE, content_type);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(authorization) = &request.authorization {
            builder = builder.header(AUTHORIZATION, authorization);
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let started = Instant::now();
        let result = async {
            let response = builder.send().await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(BackendReply { status, body })
        }
        .await;
        let elapsed = started.elapsed().as_secs_f64();

        match result {
            Ok(reply) => {
                tracing::debug!(
                    route = request.route,
                    method = %request.method,
                    status = reply.status.as_u16(),
                    elapsed_ms = (elapsed * 1000.0) as u64,
                    "backend replied"
                );
                metrics::record_backend_call(request.route, reply.status.as_str(), elapsed);
                Ok(reply)
            }
            Err(err) => {
                let err = classify(err, timeout.unwrap_or(self.connect_timeout));
                tracing::warn!(
                    route = request.route,
                    method = %request.method,
                    url = %url,
                    error = %err,
                    "backend call failed"
                );
                let outcome = match err {
                    BackendError::Timeout(_) => "timeout",
                    BackendError::Connect(_) => "connect_error",
                    BackendError::Transport(_) => "transport_error",
                };
                metrics::record_backend_call(request.route, outcome, elapsed);
                Err(err)
            }
        }
    }

    /// Any HTTP answer counts as reachable; only transport failures do not.
    pub(crate) async fn ping(&self) -> Result<StatusCode, BackendError> {
        let timeout = Duration::from_secs(3);
        self.client
            .get(&self.base_url)
            .timeout(timeout)
            .send()
            .await
            .map(|response| response.status())
            .map_err(|err| classify(err, timeout))
    }
}

fn classify(err: reqwest::Error, timeout: Duration) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout(timeout)
    } else if err.is_connect() {
        BackendError::Connect(err.to_string())
    } else {
        BackendError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::routing::get;
    use axum::Router;
    use reqwest::Method;

    use super::{BackendClient, BackendError, BackendRequest};
    use crate::test_support;

    #[tokio::test]
    async fn url_for_appends_query() {
        let _guard = test_support::env_lock().await;
        let settings = test_support::settings_for("http://backend:5000");
        let client = BackendClient::from_settings(&settings).expect("client");

        assert_eq!(client.url_for("/api/sessions", None), "http://backend:5000/api/sessions");
        assert_eq!(
            client.url_for("/api/sessions", Some("type=exam")),
            "http://backend:5000/api/sessions?type=exam"
        );
    }

    #[tokio::test]
    async fn forwards_authorization_and_body() {
        let _guard = test_support::env_lock().await;
        let backend = test_support::MockBackend::start(Router::new().route(
            "/api/echo",
            axum::routing::post(|headers: axum::http::HeaderMap, body: String| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-")
                    .to_string();
                format!("{auth}|{body}")
            }),
        ))
        .await;
        let client = BackendClient::from_settings(&test_support::settings_for(&backend.url()))
            .expect("client");

        let request = BackendRequest::new("echo", Method::POST, "/api/echo")
            .authorization(Some("Bearer abc".to_string()))
            .json(&serde_json::json!({"x": 1}))
            .expect("json");
        let reply = client.send(request).await.expect("reply");

        assert_eq!(reply.status, 200);
        assert_eq!(&reply.body[..], b"Bearer abc|{\"x\":1}");
    }

    #[tokio::test]
    async fn slow_backend_maps_to_timeout() {
        let _guard = test_support::env_lock().await;
        let backend = test_support::MockBackend::start(Router::new().route(
            "/api/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        ))
        .await;
        let client = BackendClient::from_settings(&test_support::settings_for(&backend.url()))
            .expect("client");

        let request = BackendRequest::new("slow", Method::GET, "/api/slow")
            .timeout(Duration::from_millis(100));
        let err = client.send(request).await.expect_err("timeout");

        assert!(matches!(err, BackendError::Timeout(_)));
    }

    #[tokio::test]
    async fn long_generation_is_not_cut_short_by_default() {
        let _guard = test_support::env_lock().await;
        let backend = test_support::MockBackend::start(Router::new().route(
            "/api/questions/generate",
            axum::routing::post(|| async {
                tokio::time::sleep(Duration::from_millis(1500)).await;
                "generated"
            }),
        ))
        .await;
        let settings = test_support::settings_with(
            &backend.url(),
            &[("BACKEND_CONNECT_TIMEOUT_SECONDS", "1")],
        );
        let client = BackendClient::from_settings(&settings).expect("client");

        let reply = client
            .send(BackendRequest::new("questions.generate", Method::POST, "/api/questions/generate"))
            .await
            .expect("reply");

        assert_eq!(reply.status, 200);
        assert_eq!(&reply.body[..], b"generated");
    }

    #[tokio::test]
    async fn unreachable_backend_is_reported() {
        let _guard = test_support::env_lock().await;
        let client =
            BackendClient::from_settings(&test_support::settings_for("http://127.0.0.1:9"))
                .expect("client");

        let err = client
            .send(BackendRequest::new("ping", Method::GET, "/api/ping"))
            .await
            .expect_err("unreachable");

        assert!(matches!(err, BackendError::Connect(_) | BackendError::Transport(_)));
    }
}
