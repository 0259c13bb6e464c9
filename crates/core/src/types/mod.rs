//! Core types for Shopfront.
//!
//! Type-safe wrappers and wire records for the storefront backend.

pub mod cart;
pub mod email;
pub mod id;
pub mod order;
pub mod price;
pub mod product;
pub mod status;
mod timestamp;
pub mod user;

pub use cart::{Cart, CartItem, cart_item_count, cart_total};
pub use email::{Email, EmailError};
pub use id::*;
pub use order::{Order, OrderItem};
pub use price::{Price, PriceError};
pub use product::Product;
pub use status::OrderStatus;
pub use user::UserProfile;
