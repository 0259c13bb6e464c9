//! Forced navigation to the login entry point.

/// Path of the login entry point.
pub const LOGIN_PATH: &str = "/login";

/// Reacts to an expired or rejected session.
///
/// Invoked by the API adapter after it has cleared the session store because
/// a request came back 401. Implementations move the user to the login entry
/// point: a UI router navigates, a CLI tells the user to log in again.
pub trait LoginRedirect: Send + Sync {
    /// Send the user to the login entry point.
    fn redirect_to_login(&self);
}

/// Default redirect that only records the navigation in the logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRedirect;

impl LoginRedirect for LogRedirect {
    fn redirect_to_login(&self) {
        tracing::warn!(login_path = LOGIN_PATH, "Session rejected, redirecting to login");
    }
}

impl<F> LoginRedirect for F
where
    F: Fn() + Send + Sync,
{
    fn redirect_to_login(&self) {
        self();
    }
}
