use std::sync::Arc;

use crate::core::config::Settings;
use crate::services::backend::BackendClient;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    backend: BackendClient,
}

impl AppState {
    pub(crate) fn new(settings: Settings, backend: BackendClient) -> Self {
        Self { inner: Arc::new(InnerState { settings, backend }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }
}
