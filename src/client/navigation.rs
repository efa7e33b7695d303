use std::sync::{Mutex, PoisonError};

use crate::client::routes::with_base_path;

/// Where the "browser" is and how views move it.
pub trait Navigator: Send + Sync {
    /// Full current path, base path included.
    fn current_path(&self) -> String;

    /// Client-side navigation to an app path; the base path is added.
    fn push(&self, path: &str);

    /// Full page load of `href`, used when the session is torn down.
    fn hard_navigate(&self, href: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Push(String),
    Hard(String),
}

/// In-process [`Navigator`] that records every navigation.
#[derive(Debug)]
pub struct PageLocation {
    base_path: String,
    state: Mutex<LocationState>,
}

#[derive(Debug)]
struct LocationState {
    path: String,
    history: Vec<Navigation>,
}

impl PageLocation {
    /// Starts at `path` (an app path, base path added).
    pub fn new(base_path: impl Into<String>, path: &str) -> Self {
        let base_path = base_path.into();
        let path = with_base_path(&base_path, path);
        Self { base_path, state: Mutex::new(LocationState { path, history: Vec::new() }) }
    }

    pub fn history(&self) -> Vec<Navigation> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).history.clone()
    }

    pub fn last(&self) -> Option<Navigation> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).history.last().cloned()
    }
}

impl Navigator for PageLocation {
    fn current_path(&self) -> String {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).path.clone()
    }

    fn push(&self, path: &str) {
        let target = with_base_path(&self.base_path, path);
        tracing::debug!(target = %target, "navigate");
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.path = target.clone();
        state.history.push(Navigation::Push(target));
    }

    fn hard_navigate(&self, href: &str) {
        tracing::debug!(target = %href, "hard navigate");
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.path = href.to_string();
        state.history.push(Navigation::Hard(href.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::{Navigation, Navigator, PageLocation};

    #[test]
    fn push_applies_base_path() {
        let location = PageLocation::new("/iview3", "/student/interview");
        assert_eq!(location.current_path(), "/iview3/student/interview");

        location.push("/student/results/4");
        assert_eq!(location.current_path(), "/iview3/student/results/4");
        assert_eq!(location.last(), Some(Navigation::Push("/iview3/student/results/4".into())));
    }
}
