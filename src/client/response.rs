use std::borrow::Cow;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::client::messages;
use crate::client::navigation::Navigator;
use crate::client::routes::{with_base_path, RouteClass};
use crate::client::token_store::TokenStore;

/// Where a forbidden session is sent to start over.
pub(crate) const ROLE_SELECTION: &str = "/select-role";

/// Failure of a client call. `Display` is the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("{}", messages::NETWORK_ERROR)]
    Network { detail: String },
    #[error("{}", messages::READ_TIMEOUT)]
    Timeout,
    #[error("{}", messages::SESSION_EXPIRED)]
    SessionExpired,
    #[error("{0}")]
    Unauthorized(String),
    #[error("{message}")]
    Forbidden { message: String, redirected: bool },
    #[error("{message}")]
    Backend { status: u16, message: String },
    #[error("Invalid response from server: {0}")]
    Decode(String),
    #[error("{0}")]
    InvalidInput(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::SessionExpired | Self::Unauthorized(_) => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            tracing::warn!(error = %err, "request timed out");
            Self::Timeout
        } else {
            tracing::warn!(error = %err, "request failed without a response");
            Self::Network { detail: err.to_string() }
        }
    }
}

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// The backend's `error` field, or the raw text when the body is not JSON.
    pub fn backend_message(&self) -> Option<String> {
        match serde_json::from_slice::<Value>(&self.body) {
            Ok(value) => value.get("error").and_then(Value::as_str).map(str::to_string),
            Err(_) => {
                let text = self.text().trim().to_string();
                (!text.is_empty()).then_some(text)
            }
        }
    }
}

/// Turns a response into the declared payload or a [`ClientError`],
/// applying the session policy for 401 and 403.
pub fn handle_response<T: DeserializeOwned>(
    response: RawResponse,
    store: &dyn TokenStore,
    navigator: &dyn Navigator,
    base_path: &str,
) -> Result<T, ClientError> {
    if response.status.is_success() {
        let body: &[u8] = if response.body.is_empty() { b"null" } else { &response.body };
        return serde_json::from_slice(body).map_err(|err| {
            tracing::warn!(error = %err, status = response.status.as_u16(), "unexpected response body");
            ClientError::Decode(err.to_string())
        });
    }

    let page = RouteClass::classify(&navigator.current_path(), base_path);
    let message = response.backend_message();

    match response.status {
        StatusCode::UNAUTHORIZED if !page.is_login() => {
            tracing::info!("session rejected after refresh, clearing tokens");
            store.clear();
            Err(ClientError::SessionExpired)
        }
        StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized(
            message.unwrap_or_else(|| messages::INVALID_CREDENTIALS.to_string()),
        )),
        StatusCode::FORBIDDEN => {
            let redirected = !page.is_login() && !page.is_role_protected();
            if redirected {
                store.clear();
                navigator.hard_navigate(&with_base_path(base_path, ROLE_SELECTION));
            }
            Err(ClientError::Forbidden {
                message: message.unwrap_or_else(|| messages::FORBIDDEN.to_string()),
                redirected,
            })
        }
        status => Err(ClientError::Backend {
            status: status.as_u16(),
            message: message
                .unwrap_or_else(|| format!("Request failed: status={}", status.as_u16())),
        }),
    }
}
