use std::collections::HashMap;

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
#[cfg(test)]
use futures::future::BoxFuture;

use crate::api::errors::ApiError;

/// Path parameters as handed over by the routing layer. Axum delivers them
/// up front; tests also hand them over as a future. Handlers call
/// [`PathParams::resolve`] once at entry and never care which.
pub(crate) enum PathParams {
    Ready(HashMap<String, String>),
    #[cfg(test)]
    Deferred(BoxFuture<'static, HashMap<String, String>>),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ResolvedParams(HashMap<String, String>);

impl PathParams {
    #[cfg(test)]
    pub(crate) fn deferred<F>(future: F) -> Self
    where
        F: std::future::Future<Output = HashMap<String, String>> + Send + 'static,
    {
        use futures::FutureExt;

        Self::Deferred(future.boxed())
    }

    pub(crate) async fn resolve(self) -> ResolvedParams {
        match self {
            PathParams::Ready(values) => ResolvedParams(values),
            #[cfg(test)]
            PathParams::Deferred(future) => ResolvedParams(future.await),
        }
    }
}

impl ResolvedParams {
    /// Returns the named segment, or a 400 naming `label` when it is missing,
    /// blank, or would escape its path segment.
    pub(crate) fn require(&self, key: &str, label: &str) -> Result<&str, ApiError> {
        let value = self.0.get(key).map(|value| value.trim()).unwrap_or_default();
        if value.is_empty() {
            return Err(ApiError::missing_param(label));
        }
        if value.contains(['/', '?', '#']) {
            return Err(ApiError::BadRequest(format!("invalid {label}")));
        }
        Ok(value)
    }
}

impl From<HashMap<String, String>> for PathParams {
    fn from(values: HashMap<String, String>) -> Self {
        Self::Ready(values)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for PathParams
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(values) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|err| ApiError::BadRequest(err.body_text()))?;
        Ok(Self::Ready(values))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::PathParams;
    use crate::api::errors::ApiError;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn ready_and_deferred_resolve_the_same() {
        let ready = PathParams::from(params(&[("id", "42")])).resolve().await;

        let (tx, rx) = tokio::sync::oneshot::channel();
        let deferred = PathParams::deferred(async move { rx.await.unwrap_or_default() });
        tx.send(params(&[("id", "42")])).expect("send params");
        let deferred = deferred.resolve().await;

        assert_eq!(ready.require("id", "session_id").expect("ready"), "42");
        assert_eq!(deferred.require("id", "session_id").expect("deferred"), "42");
    }

    #[tokio::test]
    async fn missing_or_blank_is_rejected() {
        let resolved = PathParams::from(params(&[("id", "  ")])).resolve().await;

        let err = resolved.require("id", "student_session_id").expect_err("blank");
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "student_session_id is required"));
        assert!(resolved.require("other", "answer_id").is_err());
    }

    #[tokio::test]
    async fn segment_escape_is_rejected() {
        let resolved = PathParams::from(params(&[("id", "1/../admin")])).resolve().await;

        assert!(matches!(resolved.require("id", "session_id"), Err(ApiError::BadRequest(_))));
    }
}
