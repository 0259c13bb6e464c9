//! Shopfront storefront client.
//!
//! Talks to the storefront backend over REST and keeps the shopper's cart in
//! sync with it:
//!
//! - [`api::ApiClient`]: one operation per backend action, with the bearer
//!   token and the 401 policy applied in a single transport wrapper
//! - [`session`]: where the credential lives between requests
//! - [`cart::CartManager`]: local cart mirror with refresh-after-mutation
//!   semantics

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod config;
pub mod error;
pub mod session;

pub use api::{ApiClient, REQUEST_ID_HEADER};
pub use cart::{CartBackend, CartManager, CartSnapshot};
pub use config::{ClientConfig, ConfigError};
pub use error::ApiError;
pub use session::{
    FileSessionStore, LogRedirect, LoginRedirect, MemorySessionStore, SessionCredential,
    SessionError, SessionStore,
};
