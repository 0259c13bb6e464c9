//! File-backed session store.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use shopfront_core::UserProfile;

use super::{SessionCredential, SessionError, SessionStore};

/// On-disk representation of a session.
#[derive(Serialize, Deserialize)]
struct StoredSession {
    token: String,
    user: UserProfile,
}

/// Session store persisted as JSON so it survives process restarts.
///
/// The file is read once, lazily, and kept in memory afterwards. Writes go to
/// both.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    cached: RwLock<Option<Option<SessionCredential>>>,
}

impl FileSessionStore {
    /// Create a store backed by `path`. Nothing is read until first use.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: RwLock::new(None),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Option<SessionCredential>, SessionError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let stored: StoredSession = serde_json::from_str(&raw)?;
        Ok(Some(SessionCredential::new(stored.token, stored.user)))
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self) -> Result<Option<SessionCredential>, SessionError> {
        if let Some(cached) = self
            .cached
            .read()
            .map_err(|_| SessionError::Poisoned)?
            .as_ref()
        {
            return Ok(cached.clone());
        }

        let loaded = self.load()?;
        *self.cached.write().map_err(|_| SessionError::Poisoned)? = Some(loaded.clone());
        Ok(loaded)
    }

    fn set(&self, credential: SessionCredential) -> Result<(), SessionError> {
        let stored = StoredSession {
            token: credential.token.expose_secret().to_string(),
            user: credential.user.clone(),
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(&stored)?)?;

        *self.cached.write().map_err(|_| SessionError::Poisoned)? = Some(Some(credential));
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        *self.cached.write().map_err(|_| SessionError::Poisoned)? = Some(None);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopfront_core::{Email, UserId};

    use super::*;

    fn credential() -> SessionCredential {
        SessionCredential::new(
            "persisted-token",
            UserProfile {
                id: Some(UserId::new(3)),
                name: Some("Grace".to_string()),
                email: Email::parse("grace@example.com").unwrap(),
            },
        )
    }

    #[test]
    fn test_missing_file_is_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json"));
        assert!(store.get().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn test_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        FileSessionStore::new(&path).set(credential()).unwrap();

        let reopened = FileSessionStore::new(&path);
        let loaded = reopened.get().unwrap().unwrap();
        assert_eq!(loaded.bearer(), "Bearer persisted-token");
        assert_eq!(loaded.user.display_name(), "Grace");
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = FileSessionStore::new(&path);

        store.set(credential()).unwrap();
        assert!(path.exists());

        store.clear().unwrap();
        assert!(!path.exists());
        assert!(store.get().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileSessionStore::new(&path);
        assert!(matches!(store.get(), Err(SessionError::Format(_))));
    }
}
