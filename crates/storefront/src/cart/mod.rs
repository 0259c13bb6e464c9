//! Client-side cart state.
//!
//! [`CartManager`] keeps a mirror of the server cart and refreshes it after
//! every mutation. It talks to the backend through the [`CartBackend`] port so
//! the state machine can be exercised without HTTP.

mod manager;

use async_trait::async_trait;
use shopfront_core::{Cart, CartItemId, ProductId};

use crate::api::ApiClient;
use crate::error::ApiError;

pub use manager::{CartManager, CartSnapshot};

/// Port for the cart endpoints the manager depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartBackend: Send + Sync {
    /// Whether a session credential is currently stored.
    fn has_session(&self) -> bool;

    /// Fetch the authoritative cart.
    async fn get_cart(&self) -> Result<Cart, ApiError>;

    /// Add units of a product.
    async fn add_item(&self, product_id: ProductId, quantity: u32) -> Result<(), ApiError>;

    /// Replace a line's quantity.
    async fn update_item(&self, item_id: CartItemId, quantity: u32) -> Result<(), ApiError>;

    /// Remove a line.
    async fn remove_item(&self, item_id: CartItemId) -> Result<(), ApiError>;

    /// Remove every line.
    async fn clear(&self) -> Result<(), ApiError>;
}

#[async_trait]
impl CartBackend for ApiClient {
    fn has_session(&self) -> bool {
        Self::has_session(self)
    }

    async fn get_cart(&self) -> Result<Cart, ApiError> {
        Self::get_cart(self).await
    }

    async fn add_item(&self, product_id: ProductId, quantity: u32) -> Result<(), ApiError> {
        self.add_cart_item(product_id, quantity).await
    }

    async fn update_item(&self, item_id: CartItemId, quantity: u32) -> Result<(), ApiError> {
        self.update_cart_item(item_id, quantity).await
    }

    async fn remove_item(&self, item_id: CartItemId) -> Result<(), ApiError> {
        self.remove_cart_item(item_id).await
    }

    async fn clear(&self) -> Result<(), ApiError> {
        self.clear_cart().await
    }
}
