use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};

type RefreshOutcome = Shared<BoxFuture<'static, bool>>;

/// Collapses concurrent token refreshes into one call. The first caller
/// starts the refresh; everyone arriving while it runs awaits the same
/// outcome. The slot empties as soon as the refresh resolves.
#[derive(Clone, Default)]
pub struct RefreshCoordinator {
    slot: Arc<Mutex<Option<RefreshOutcome>>>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_progress(&self) -> bool {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Joins the refresh in flight, or starts one with `start`.
    pub async fn run<F, Fut>(&self, start: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let outcome = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(outcome) => outcome.clone(),
                None => {
                    let release = Arc::clone(&self.slot);
                    let refresh = start();
                    let outcome = async move {
                        let refreshed = refresh.await;
                        release.lock().unwrap_or_else(PoisonError::into_inner).take();
                        refreshed
                    }
                    .boxed()
                    .shared();
                    *slot = Some(outcome.clone());
                    outcome
                }
            }
        };

        outcome.await
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator").field("in_progress", &self.in_progress()).finish()
    }
}
