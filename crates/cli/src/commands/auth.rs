//! Session commands.

use secrecy::SecretString;
use shopfront_core::Email;
use shopfront_storefront::ApiClient;
use shopfront_storefront::api::NewAccount;

use super::CommandError;

/// Sign in and persist the session.
pub async fn login(api: &ApiClient, email: &str, password: SecretString) -> Result<(), CommandError> {
    let email = Email::parse(email)?;
    let credential = api.login(&email, &password).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("Logged in as {}", credential.user.display_name());
    }
    Ok(())
}

/// Create an account; the resulting session is persisted.
pub async fn register(
    api: &ApiClient,
    email: &str,
    password: SecretString,
    name: Option<String>,
) -> Result<(), CommandError> {
    let account = NewAccount {
        email: Email::parse(email)?,
        password,
        name,
    };
    let credential = api.register(&account).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("Registered and logged in as {}", credential.user.display_name());
    }
    Ok(())
}

/// Forget the stored session.
pub fn logout(api: &ApiClient) -> Result<(), CommandError> {
    api.logout()?;

    #[allow(clippy::print_stdout)]
    {
        println!("Logged out");
    }
    Ok(())
}

/// Show who is signed in.
pub fn whoami(api: &ApiClient) -> Result<(), CommandError> {
    let session = api.current_session()?;

    #[allow(clippy::print_stdout)]
    {
        match session {
            Some(credential) => {
                let user = &credential.user;
                println!("{} <{}>", user.display_name(), user.email);
            }
            None => println!("Not logged in"),
        }
    }
    Ok(())
}
