//! Session credential storage and the login boundary.
//!
//! The API adapter never reaches for ambient global state: it is handed a
//! [`SessionStore`] and a [`LoginRedirect`] at construction. The store is read
//! on every outbound request, written on login/registration, and cleared on
//! logout or whenever any request comes back 401.

mod file;
mod redirect;

use std::sync::RwLock;

use secrecy::{ExposeSecret, SecretString};
use shopfront_core::UserProfile;
use thiserror::Error;

pub use file::FileSessionStore;
pub use redirect::{LOGIN_PATH, LogRedirect, LoginRedirect};

/// Errors raised by session store implementations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Reading or writing the backing file failed.
    #[error("Session storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted session could not be encoded or decoded.
    #[error("Session storage format error: {0}")]
    Format(#[from] serde_json::Error),

    /// The in-memory lock was poisoned by a panicking writer.
    #[error("Session lock poisoned")]
    Poisoned,
}

/// An authenticated session: bearer token plus minimal profile.
#[derive(Clone)]
pub struct SessionCredential {
    /// Opaque bearer token.
    pub token: SecretString,
    /// Cached user profile.
    pub user: UserProfile,
}

impl SessionCredential {
    /// Create a credential from a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>, user: UserProfile) -> Self {
        Self {
            token: SecretString::from(token.into()),
            user,
        }
    }

    /// `Authorization` header value for this credential.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token.expose_secret())
    }
}

impl std::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredential")
            .field("token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

/// Process-wide storage for the current session credential.
///
/// Lifecycle: `set` on login/registration success, `get` on every outbound
/// request, `clear` on logout or on any authorization-denied response.
pub trait SessionStore: Send + Sync {
    /// Current credential, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get(&self) -> Result<Option<SessionCredential>, SessionError>;

    /// Replace the current credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, credential: SessionCredential) -> Result<(), SessionError>;

    /// Destroy the current credential. Clearing an empty store succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be removed.
    fn clear(&self) -> Result<(), SessionError>;
}

/// Session store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    credential: RwLock<Option<SessionCredential>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `credential`.
    #[must_use]
    pub fn with_credential(credential: SessionCredential) -> Self {
        Self {
            credential: RwLock::new(Some(credential)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Result<Option<SessionCredential>, SessionError> {
        Ok(self
            .credential
            .read()
            .map_err(|_| SessionError::Poisoned)?
            .clone())
    }

    fn set(&self, credential: SessionCredential) -> Result<(), SessionError> {
        *self
            .credential
            .write()
            .map_err(|_| SessionError::Poisoned)? = Some(credential);
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self
            .credential
            .write()
            .map_err(|_| SessionError::Poisoned)? = None;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopfront_core::Email;

    use super::*;

    fn credential(token: &str) -> SessionCredential {
        SessionCredential::new(
            token,
            UserProfile {
                id: None,
                name: None,
                email: Email::parse("shopper@example.com").unwrap(),
            },
        )
    }

    #[test]
    fn test_memory_store_lifecycle() {
        let store = MemorySessionStore::new();
        assert!(store.get().unwrap().is_none());

        store.set(credential("tok-1")).unwrap();
        assert_eq!(store.get().unwrap().unwrap().bearer(), "Bearer tok-1");

        store.set(credential("tok-2")).unwrap();
        assert_eq!(store.get().unwrap().unwrap().bearer(), "Bearer tok-2");

        store.clear().unwrap();
        assert!(store.get().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", credential("super-secret-token"));
        assert!(!debug.contains("super-secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }
}
