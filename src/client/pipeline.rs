use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::client::navigation::Navigator;
use crate::client::refresh::RefreshCoordinator;
use crate::client::response::{self, ClientError, RawResponse};
use crate::client::routes::RouteClass;
use crate::client::token_store::TokenStore;
use crate::client::types::{FileUpload, RefreshRequest, RefreshResponse};

const REFRESH_PATH: &str = "/api/auth/refresh";

/// Where the BFF is reachable from this client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Scheme and authority of the BFF, e.g. `http://localhost:3000`.
    pub base_url: String,
    /// Deployment prefix, e.g. `/iview3`; empty when served at the root.
    pub base_path: String,
    pub connect_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            base_path: String::new(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        let base_path = base_path.into();
        let trimmed = base_path.trim_matches('/');
        self.base_path = if trimmed.is_empty() { String::new() } else { format!("/{trimmed}") };
        self
    }
}

#[derive(Debug, Clone)]
pub enum OutboundBody {
    Json(Value),
    Multipart(Vec<FormPart>),
}

#[derive(Debug, Clone)]
pub struct FormPart {
    pub name: String,
    pub value: FormValue,
}

#[derive(Debug, Clone)]
pub enum FormValue {
    Text(String),
    File(FileUpload),
}

impl FormPart {
    pub fn text(name: &str, value: impl Into<String>) -> Self {
        Self { name: name.to_string(), value: FormValue::Text(value.into()) }
    }

    pub fn file(name: &str, file: FileUpload) -> Self {
        Self { name: name.to_string(), value: FormValue::File(file) }
    }
}

/// A request that can be sent more than once. Headers are fixed when the
/// request is built; the body is rebuilt on every send.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<OutboundBody>,
    timeout: Option<Duration>,
}

impl OutboundRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    pub fn bearer(mut self, access_token: &str) -> Self {
        self.set_bearer(access_token);
        self
    }

    pub fn json<T: Serialize>(mut self, payload: &T) -> Result<Self, ClientError> {
        let value = serde_json::to_value(payload)
            .map_err(|err| ClientError::InvalidInput(err.to_string()))?;
        self.body = Some(OutboundBody::Json(value));
        Ok(self)
    }

    pub fn multipart(mut self, parts: Vec<FormPart>) -> Self {
        self.body = Some(OutboundBody::Multipart(parts));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn authorization(&self) -> Option<&str> {
        self.headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok())
    }

    fn set_bearer(&mut self, access_token: &str) {
        match HeaderValue::from_str(&format!("Bearer {access_token}")) {
            Ok(value) => {
                self.headers.insert(AUTHORIZATION, value);
            }
            Err(err) => {
                tracing::warn!(error = %err, "access token is not a valid header value");
                self.headers.remove(AUTHORIZATION);
            }
        }
    }
}

/// Sends requests to the BFF on behalf of one tab: attaches credentials,
/// refreshes once on 401, and applies the session policy to failures.
pub struct RequestPipeline {
    http: Client,
    config: ClientConfig,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    coordinator: RefreshCoordinator,
}

impl RequestPipeline {
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> anyhow::Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .context("Failed to build client HTTP stack")?;

        Ok(Self { http, config, store, navigator, coordinator: RefreshCoordinator::new() })
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    pub fn base_path(&self) -> &str {
        &self.config.base_path
    }

    pub fn route_class(&self) -> RouteClass {
        RouteClass::classify(&self.navigator.current_path(), &self.config.base_path)
    }

    /// A request carrying the stored access token, if there is one.
    pub fn authorized(&self, method: Method, path: impl Into<String>) -> OutboundRequest {
        let request = OutboundRequest::new(method, path);
        match self.store.get() {
            Some(credentials) => request.bearer(&credentials.access_token),
            None => request,
        }
    }

    /// Sends `request`; on 401 refreshes (single-flight) and re-sends it once
    /// with the new token. A failed refresh returns the original 401.
    pub async fn execute(
        &self,
        request: &OutboundRequest,
        retry_on_401: bool,
    ) -> Result<RawResponse, ClientError> {
        let response = self.send(request).await?;
        if response.status != StatusCode::UNAUTHORIZED || !retry_on_401 {
            return Ok(response);
        }
        if self.route_class().is_login() {
            return Ok(response);
        }
        if !self.refresh().await {
            return Ok(response);
        }

        // Signed out while the refresh was in flight; resending would only
        // replay the rejected bearer.
        let Some(credentials) = self.store.get() else {
            tracing::debug!(method = %request.method, path = %request.path, "session cleared during refresh");
            return Ok(response);
        };
        let mut retry = request.clone();
        retry.set_bearer(&credentials.access_token);
        tracing::debug!(method = %retry.method, path = %retry.path, "retrying with refreshed token");
        self.send(&retry).await
    }

    /// Exchanges the refresh token for a new pair. Concurrent callers share
    /// one network call. Never fails; `false` leaves the store untouched.
    pub async fn refresh(&self) -> bool {
        let http = self.http.clone();
        let url = self.url(REFRESH_PATH);
        let store = Arc::clone(&self.store);
        self.coordinator.run(move || refresh_tokens(http, url, store)).await
    }

    pub fn handle_response<T: DeserializeOwned>(
        &self,
        response: RawResponse,
    ) -> Result<T, ClientError> {
        response::handle_response(
            response,
            self.store.as_ref(),
            self.navigator.as_ref(),
            &self.config.base_path,
        )
    }

    /// `execute` with retry, then `handle_response`.
    pub async fn call<T: DeserializeOwned>(&self, request: OutboundRequest) -> Result<T, ClientError> {
        let response = self.execute(&request, true).await?;
        self.handle_response(response)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.config.base_url, self.config.base_path, path)
    }

    async fn send(&self, request: &OutboundRequest) -> Result<RawResponse, ClientError> {
        let mut builder = self
            .http
            .request(request.method.clone(), self.url(&request.path))
            .headers(request.headers.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        builder = match &request.body {
            Some(OutboundBody::Json(value)) => builder.json(value),
            Some(OutboundBody::Multipart(parts)) => builder.multipart(build_form(parts)?),
            None => builder,
        };

        let response = builder.send().await.map_err(ClientError::from_transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(ClientError::from_transport)?;
        tracing::debug!(method = %request.method, path = %request.path, status = status.as_u16(), "response");

        Ok(RawResponse { status, body: body.to_vec() })
    }
}

impl std::fmt::Debug for RequestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPipeline")
            .field("config", &self.config)
            .field("coordinator", &self.coordinator)
            .finish()
    }
}

fn build_form(parts: &[FormPart]) -> Result<Form, ClientError> {
    parts.iter().try_fold(Form::new(), |form, part| {
        let name = part.name.clone();
        match &part.value {
            FormValue::Text(value) => Ok(form.text(name, value.clone())),
            FormValue::File(file) => {
                let mut body = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
                if let Some(content_type) = &file.content_type {
                    body = body
                        .mime_str(content_type)
                        .map_err(|err| ClientError::InvalidInput(err.to_string()))?;
                }
                Ok(form.part(name, body))
            }
        }
    })
}

async fn refresh_tokens(http: Client, url: String, store: Arc<dyn TokenStore>) -> bool {
    let Some(refresh_token) = store.get().and_then(|credentials| credentials.refresh_token) else {
        tracing::info!("No refresh token available");
        return false;
    };

    let response = match http.post(&url).json(&RefreshRequest { refresh_token }).send().await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(error = %err, "Error refreshing token");
            return false;
        }
    };

    if !response.status().is_success() {
        tracing::info!(status = response.status().as_u16(), "Refresh token failed");
        return false;
    }

    match response.json::<RefreshResponse>().await {
        Ok(RefreshResponse { token: Some(token), refresh_token }) if !token.is_empty() => {
            store.rotate(token, refresh_token);
            tracing::info!("Token refreshed successfully");
            true
        }
        Ok(_) => false,
        Err(err) => {
            tracing::warn!(error = %err, "Unreadable refresh response");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use reqwest::Method;
    use serde_json::{json, Value};

    use super::{ClientConfig, OutboundRequest, RequestPipeline};
    use crate::client::navigation::PageLocation;
    use crate::client::token_store::{Credentials, MemoryTokenStore, Profile, TokenStore};
    use crate::test_support::MockBackend;

    #[derive(Default)]
    struct Calls {
        protected: AtomicUsize,
        refresh: AtomicUsize,
    }

    impl Calls {
        fn total(&self) -> usize {
            self.protected.load(Ordering::SeqCst) + self.refresh.load(Ordering::SeqCst)
        }
    }

    /// `/api/protected` only accepts `Bearer fresh`; refresh hands out
    /// `fresh` when `refresh_ok` is set.
    async fn backend(calls: Arc<Calls>, refresh_ok: bool, accept_fresh: bool) -> MockBackend {
        let protected_calls = calls.clone();
        let refresh_calls = calls;
        MockBackend::start(
            Router::new()
                .route(
                    "/api/protected",
                    get(move |headers: HeaderMap| {
                        let calls = protected_calls.clone();
                        async move {
                            calls.protected.fetch_add(1, Ordering::SeqCst);
                            let auth = headers
                                .get("authorization")
                                .and_then(|value| value.to_str().ok())
                                .unwrap_or_default()
                                .to_string();
                            if accept_fresh && auth == "Bearer fresh" {
                                (StatusCode::OK, Json(json!({"ok": true})))
                            } else {
                                (StatusCode::UNAUTHORIZED, Json(json!({"error": "Token expired"})))
                            }
                        }
                    }),
                )
                .route(
                    "/api/auth/refresh",
                    post(move |Json(body): Json<Value>| {
                        let calls = refresh_calls.clone();
                        async move {
                            calls.refresh.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(200)).await;
                            if refresh_ok && body["refresh_token"] == "r1" {
                                (StatusCode::OK, Json(json!({"token": "fresh", "refresh_token": "r2"})))
                            } else {
                                (StatusCode::UNAUTHORIZED, Json(json!({"error": "Invalid refresh token"})))
                            }
                        }
                    }),
                ),
        )
        .await
    }

    /// Behaves like a store whose session is ended elsewhere right as a
    /// refresh lands.
    struct SignedOutDuringRefresh(MemoryTokenStore);

    impl TokenStore for SignedOutDuringRefresh {
        fn get(&self) -> Option<Credentials> {
            self.0.get()
        }
        fn set(&self, credentials: Credentials) {
            self.0.set(credentials)
        }
        fn clear(&self) {
            self.0.clear()
        }
        fn profile(&self) -> Option<Profile> {
            self.0.profile()
        }
        fn set_profile(&self, profile: Profile) {
            self.0.set_profile(profile)
        }
        fn rotate(&self, _access_token: String, _refresh_token: Option<String>) {
            self.0.clear()
        }
    }

    fn pipeline(url: &str, page: &str) -> (RequestPipeline, Arc<MemoryTokenStore>) {
        let store = Arc::new(MemoryTokenStore::new());
        store.set(Credentials::new("stale", Some("r1".to_string())));
        let navigator = Arc::new(PageLocation::new("", page));
        let pipeline = RequestPipeline::new(ClientConfig::new(url), store.clone(), navigator)
            .expect("pipeline");
        (pipeline, store)
    }

    #[tokio::test]
    async fn refresh_then_retry_is_three_calls() {
        let calls = Arc::new(Calls::default());
        let mock = backend(calls.clone(), true, true).await;
        let (pipeline, store) = pipeline(&mock.url(), "/student/history");

        let request = pipeline.authorized(Method::GET, "/api/protected");
        assert_eq!(request.authorization(), Some("Bearer stale"));
        let response = pipeline.execute(&request, true).await.expect("response");

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(calls.total(), 3);
        assert_eq!(store.get(), Some(Credentials::new("fresh", Some("r2".to_string()))));
    }

    #[tokio::test]
    async fn failed_refresh_returns_original_401_and_keeps_tokens() {
        let calls = Arc::new(Calls::default());
        let mock = backend(calls.clone(), false, true).await;
        let (pipeline, store) = pipeline(&mock.url(), "/student/history");

        let request = pipeline.authorized(Method::GET, "/api/protected");
        let response = pipeline.execute(&request, true).await.expect("response");

        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(calls.protected.load(Ordering::SeqCst), 1);
        assert_eq!(store.get(), Some(Credentials::new("stale", Some("r1".to_string()))));
    }

    #[tokio::test]
    async fn cleared_session_after_refresh_is_not_retried() {
        let calls = Arc::new(Calls::default());
        let mock = backend(calls.clone(), true, true).await;
        let store = Arc::new(SignedOutDuringRefresh(MemoryTokenStore::new()));
        store.set(Credentials::new("stale", Some("r1".to_string())));
        let navigator = Arc::new(PageLocation::new("", "/student/history"));
        let pipeline = RequestPipeline::new(ClientConfig::new(&mock.url()), store.clone(), navigator)
            .expect("pipeline");

        let request = pipeline.authorized(Method::GET, "/api/protected");
        let response = pipeline.execute(&request, true).await.expect("response");

        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(calls.refresh.load(Ordering::SeqCst), 1);
        assert_eq!(calls.protected.load(Ordering::SeqCst), 1);
        assert_eq!(store.get(), None);
    }

    #[tokio::test]
    async fn retries_at_most_once() {
        let calls = Arc::new(Calls::default());
        let mock = backend(calls.clone(), true, false).await;
        let (pipeline, _store) = pipeline(&mock.url(), "/teacher/exams");

        let request = pipeline.authorized(Method::GET, "/api/protected");
        let response = pipeline.execute(&request, true).await.expect("response");

        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(calls.protected.load(Ordering::SeqCst), 2);
        assert_eq!(calls.refresh.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn login_pages_never_refresh() {
        let calls = Arc::new(Calls::default());
        let mock = backend(calls.clone(), true, true).await;
        let (pipeline, _store) = pipeline(&mock.url(), "/student/login");

        let request = pipeline.authorized(Method::GET, "/api/protected");
        let response = pipeline.execute(&request, true).await.expect("response");

        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(calls.total(), 1);
    }

    #[tokio::test]
    async fn concurrent_401s_share_one_refresh() {
        let calls = Arc::new(Calls::default());
        let mock = backend(calls.clone(), true, true).await;
        let (pipeline, _store) = pipeline(&mock.url(), "/student/history");

        let requests: Vec<OutboundRequest> =
            (0..5).map(|_| pipeline.authorized(Method::GET, "/api/protected")).collect();
        let responses = futures::future::join_all(
            requests.iter().map(|request| pipeline.execute(request, true)),
        )
        .await;

        assert_eq!(calls.refresh.load(Ordering::SeqCst), 1);
        for response in responses {
            assert_eq!(response.expect("response").status, StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn unreachable_backend_is_network_error() {
        let (pipeline, _store) = pipeline("http://127.0.0.1:9", "/");

        let err = pipeline
            .execute(&OutboundRequest::new(Method::GET, "/api/history"), true)
            .await
            .unwrap_err();

        assert!(matches!(err, super::ClientError::Network { .. }));
    }
}
