//! Shopfront Core - Shared domain types.
//!
//! This crate provides the types exchanged between the Shopfront components:
//! - `storefront` - API adapter, session store and cart state manager
//! - `cli` - Command-line front end over the storefront client
//! - `integration-tests` - Mock backend and end-to-end flows
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no storage. The backend owns every persistent record; these types
//! describe its wire shapes.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, prices, emails, catalog, cart and order records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
