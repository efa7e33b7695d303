use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// Access token plus the refresh token issued alongside it, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self { access_token: access_token.into(), refresh_token }
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
}

impl Role {
    /// Maps the backend's upper-case role onto the portal role. `LECTURER`
    /// and `TEACHER` both mean the teacher portal.
    pub fn from_backend(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "student" => Some(Self::Student),
            "lecturer" | "teacher" => Some(Self::Teacher),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
        }
    }
}

/// Who is logged in on this tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Student or lecturer code, when the backend sent one.
    #[serde(default)]
    pub code: Option<String>,
}

/// Tab-scoped session storage. Two stores never see each other's writes.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<Credentials>;
    fn set(&self, credentials: Credentials);
    fn clear(&self);
    fn profile(&self) -> Option<Profile>;
    fn set_profile(&self, profile: Profile);

    /// Replaces the access token, and the refresh token when one is given,
    /// in a single write.
    fn rotate(&self, access_token: String, refresh_token: Option<String>);
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Snapshot {
    credentials: Option<Credentials>,
    profile: Option<Profile>,
}

impl Snapshot {
    fn rotate(&mut self, access_token: String, refresh_token: Option<String>) {
        let refresh_token =
            refresh_token.or_else(|| self.credentials.take().and_then(|c| c.refresh_token));
        self.credentials = Some(Credentials { access_token, refresh_token });
    }
}

/// Process-memory store; lives as long as the "tab" does.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: RwLock<Snapshot>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<Credentials> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).credentials.clone()
    }

    fn set(&self, credentials: Credentials) {
        self.inner.write().unwrap_or_else(PoisonError::into_inner).credentials = Some(credentials);
    }

    fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Snapshot::default();
    }

    fn profile(&self) -> Option<Profile> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).profile.clone()
    }

    fn set_profile(&self, profile: Profile) {
        self.inner.write().unwrap_or_else(PoisonError::into_inner).profile = Some(profile);
    }

    fn rotate(&self, access_token: String, refresh_token: Option<String>) {
        self.inner.write().unwrap_or_else(PoisonError::into_inner).rotate(access_token, refresh_token);
    }
}

/// Keeps the session in a JSON file so it survives a restart ("reload").
/// Every mutation rewrites the file; `clear` removes it.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    inner: RwLock<Snapshot>,
}

impl FileTokenStore {
    /// Opens the store at `path`. A missing file is an empty session; an
    /// unreadable snapshot is discarded.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let snapshot = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                tracing::warn!(path = %path.display(), error = %err, "Discarding corrupt session file");
                Snapshot::default()
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Snapshot::default(),
            Err(err) => return Err(err),
        };

        Ok(Self { path, inner: RwLock::new(snapshot) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mutate(&self, apply: impl FnOnce(&mut Snapshot)) {
        let mut snapshot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut snapshot);
        if let Err(err) = persist(&self.path, &snapshot) {
            tracing::warn!(path = %self.path.display(), error = %err, "Failed to persist session");
        }
    }
}

fn persist(path: &Path, snapshot: &Snapshot) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let bytes = serde_json::to_vec(snapshot)?;
    let staging = path.with_extension("tmp");
    fs::write(&staging, bytes)?;
    fs::rename(staging, path)
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<Credentials> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).credentials.clone()
    }

    fn set(&self, credentials: Credentials) {
        self.mutate(|snapshot| snapshot.credentials = Some(credentials));
    }

    fn clear(&self) {
        let mut snapshot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *snapshot = Snapshot::default();
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "Failed to remove session file");
            }
        }
    }

    fn profile(&self) -> Option<Profile> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).profile.clone()
    }

    fn set_profile(&self, profile: Profile) {
        self.mutate(|snapshot| snapshot.profile = Some(profile));
    }

    fn rotate(&self, access_token: String, refresh_token: Option<String>) {
        self.mutate(|snapshot| snapshot.rotate(access_token, refresh_token));
    }
}
