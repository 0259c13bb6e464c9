//! Server-side cart endpoints. Never cached.

use reqwest::Method;
use serde_json::json;
use shopfront_core::{Cart, CartItemId, ProductId};
use tracing::{debug, instrument};

use super::ApiClient;
use crate::error::ApiError;

impl ApiClient {
    /// Fetch the caller's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not decode.
    #[instrument(skip(self))]
    pub async fn get_cart(&self) -> Result<Cart, ApiError> {
        let cart: Cart = self
            .send_json(self.request(Method::GET, "/api/cart"))
            .await?;
        debug!(cart_id = %cart.id, items = cart.items.len(), "Fetched cart");
        Ok(cart)
    }

    /// Add `quantity` units of a product to the cart.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the backend rejects the line (unknown product,
    /// insufficient stock).
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_cart_item(&self, product_id: ProductId, quantity: u32) -> Result<(), ApiError> {
        let body = json!({ "product_id": product_id, "quantity": quantity });
        self.send_discard(self.request(Method::POST, "/api/cart/items").json(&body))
            .await
    }

    /// Replace a cart line's quantity.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the line does not exist or the quantity is
    /// rejected.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn update_cart_item(&self, item_id: CartItemId, quantity: u32) -> Result<(), ApiError> {
        let body = json!({ "quantity": quantity });
        self.send_discard(
            self.request(Method::PUT, &format!("/api/cart/items/{item_id}"))
                .json(&body),
        )
        .await
    }

    /// Remove a cart line.
    ///
    /// # Errors
    ///
    /// Returns `Validation` with status 404 if the line does not exist.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn remove_cart_item(&self, item_id: CartItemId) -> Result<(), ApiError> {
        self.send_discard(self.request(Method::DELETE, &format!("/api/cart/items/{item_id}")))
            .await
    }

    /// Remove every line from the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<(), ApiError> {
        self.send_discard(self.request(Method::DELETE, "/api/cart"))
            .await
    }
}
