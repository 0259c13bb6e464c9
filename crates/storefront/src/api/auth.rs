//! Login, registration and logout.

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use shopfront_core::{Email, UserId, UserProfile};
use tracing::{info, instrument, warn};

use super::ApiClient;
use crate::error::ApiError;
use crate::session::SessionCredential;

/// Registration input.
#[derive(Clone)]
pub struct NewAccount {
    pub email: Email,
    pub password: SecretString,
    pub name: Option<String>,
}

impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("name", &self.name)
            .finish()
    }
}

/// Token issued by the login endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    user_id: Option<UserId>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

/// Registration either signs the user in directly or only creates the
/// account.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RegisterResponse {
    Session(TokenResponse),
    Account {
        #[serde(default)]
        id: Option<UserId>,
    },
}

impl ApiClient {
    /// Exchange credentials for a session and store it.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` on bad credentials, or any transport/decode
    /// error. The session store is untouched on failure.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<SessionCredential, ApiError> {
        let body = json!({
            "email": email.as_str(),
            "password": password.expose_secret(),
        });
        let token: TokenResponse = self
            .send_json(self.request(Method::POST, "/api/auth/login").json(&body))
            .await?;

        let credential = self.store_token(token, email, None)?;
        info!(user_id = ?credential.user.id, "Logged in");
        Ok(credential)
    }

    /// Create an account and store the resulting session.
    ///
    /// When the backend answers with the account record but no token, the
    /// client signs in with the same credentials.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the backend rejects the account (for example a
    /// duplicate email), or any error from the follow-up login.
    #[instrument(skip(self, account), fields(email = %account.email))]
    pub async fn register(&self, account: &NewAccount) -> Result<SessionCredential, ApiError> {
        let mut body = json!({
            "email": account.email.as_str(),
            "password": account.password.expose_secret(),
        });
        if let Some(name) = account.name.as_deref().filter(|n| !n.trim().is_empty()) {
            body["name"] = json!(name);
        }

        let response: RegisterResponse = self
            .send_json(self.request(Method::POST, "/api/auth/register").json(&body))
            .await?;

        match response {
            RegisterResponse::Session(token) => {
                let credential = self.store_token(token, &account.email, account.name.clone())?;
                info!(user_id = ?credential.user.id, "Registered");
                Ok(credential)
            }
            RegisterResponse::Account { id } => {
                info!(user_id = ?id, "Registered, signing in");
                let mut credential = self.login(&account.email, &account.password).await?;
                if credential.user.name.is_none() && account.name.is_some() {
                    credential.user.name.clone_from(&account.name);
                    self.inner.session.set(credential.clone())?;
                }
                Ok(credential)
            }
        }
    }

    /// Destroy the local session. The backend keeps no server-side state.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be cleared.
    #[instrument(skip(self))]
    pub fn logout(&self) -> Result<(), ApiError> {
        self.inner.session.clear()?;
        info!("Logged out");
        Ok(())
    }

    fn store_token(
        &self,
        token: TokenResponse,
        fallback_email: &Email,
        fallback_name: Option<String>,
    ) -> Result<SessionCredential, ApiError> {
        let email = match token.email.as_deref().map(Email::parse) {
            Some(Ok(email)) => email,
            Some(Err(e)) => {
                warn!(error = %e, "Backend returned an unusable email, keeping the submitted one");
                fallback_email.clone()
            }
            None => fallback_email.clone(),
        };

        let credential = SessionCredential::new(
            token.access_token,
            UserProfile {
                id: token.user_id,
                name: token.name.or(fallback_name),
                email,
            },
        );
        self.inner.session.set(credential.clone())?;
        Ok(credential)
    }
}
