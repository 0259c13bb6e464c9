//! Cart mirror with refresh-after-mutation semantics.

use std::sync::atomic::{AtomicBool, Ordering};

use rust_decimal::Decimal;
use shopfront_core::{CartItem, CartItemId, ProductId, cart_item_count, cart_total};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::CartBackend;
use crate::error::ApiError;

/// Point-in-time view of the cart with derived totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSnapshot {
    pub items: Vec<CartItem>,
    pub total_price: Decimal,
    pub item_count: u64,
}

/// Keeps the loading flag set for as long as it lives.
struct LoadingGuard<'a>(&'a AtomicBool);

impl<'a> LoadingGuard<'a> {
    fn start(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Local mirror of the server cart.
///
/// Mutations never edit the mirror speculatively: each one calls the backend
/// and then re-fetches the whole cart, except [`clear`](Self::clear), whose
/// result is known. Fetch failures degrade to an empty cart; mutation
/// failures propagate to the caller with the mirror untouched.
///
/// Overlapping mutations are not serialized. Callers should disable cart
/// controls while [`is_loading`](Self::is_loading) is true.
pub struct CartManager<B> {
    backend: B,
    items: RwLock<Vec<CartItem>>,
    loading: AtomicBool,
}

impl<B> std::fmt::Debug for CartManager<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartManager")
            .field("loading", &self.is_loading())
            .finish_non_exhaustive()
    }
}

impl<B> CartManager<B> {
    /// Whether an operation is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }
}

impl<B: CartBackend> CartManager<B> {
    /// Create a manager with an empty mirror. Call
    /// [`initialize`](Self::initialize) to load the server cart.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            items: RwLock::new(Vec::new()),
            loading: AtomicBool::new(false),
        }
    }

    /// Load the cart if a session exists, otherwise start empty without
    /// touching the network.
    #[instrument(skip(self))]
    pub async fn initialize(&self) {
        if self.backend.has_session() {
            self.fetch().await;
        } else {
            debug!("No session, starting with an empty cart");
            self.items.write().await.clear();
        }
    }

    /// Replace the mirror with the server cart. Any failure leaves the cart
    /// empty instead of surfacing an error.
    #[instrument(skip(self))]
    pub async fn fetch(&self) {
        let _loading = LoadingGuard::start(&self.loading);
        self.refresh().await;
    }

    /// Add units of a product, then re-fetch.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the add fails; the mirror is unchanged.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add(&self, product_id: ProductId, quantity: u32) -> Result<(), ApiError> {
        let _loading = LoadingGuard::start(&self.loading);
        self.backend.add_item(product_id, quantity).await?;
        self.refresh().await;
        Ok(())
    }

    /// Set a line's quantity, then re-fetch.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for a zero quantity without calling the
    /// backend, or the backend error if the update fails.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn update(&self, item_id: CartItemId, quantity: u32) -> Result<(), ApiError> {
        if quantity == 0 {
            return Err(ApiError::InvalidRequest(
                "quantity must be at least 1; remove the item instead".to_string(),
            ));
        }

        let _loading = LoadingGuard::start(&self.loading);
        self.backend.update_item(item_id, quantity).await?;
        self.refresh().await;
        Ok(())
    }

    /// Remove a line, then re-fetch.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the removal fails.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn remove(&self, item_id: CartItemId) -> Result<(), ApiError> {
        let _loading = LoadingGuard::start(&self.loading);
        self.backend.remove_item(item_id).await?;
        self.refresh().await;
        Ok(())
    }

    /// Empty the cart. The mirror is emptied directly on success.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the clear fails; the mirror is unchanged.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), ApiError> {
        let _loading = LoadingGuard::start(&self.loading);
        self.backend.clear().await?;
        self.items.write().await.clear();
        Ok(())
    }

    /// Current cart lines.
    pub async fn items(&self) -> Vec<CartItem> {
        self.items.read().await.clone()
    }

    /// Sum of unit price times quantity over all lines.
    pub async fn total_price(&self) -> Decimal {
        cart_total(&self.items.read().await)
    }

    /// Total units across all lines.
    pub async fn item_count(&self) -> u64 {
        cart_item_count(&self.items.read().await)
    }

    /// Lines plus derived totals, read under one lock.
    pub async fn snapshot(&self) -> CartSnapshot {
        let items = self.items.read().await;
        CartSnapshot {
            total_price: cart_total(&items),
            item_count: cart_item_count(&items),
            items: items.to_vec(),
        }
    }

    async fn refresh(&self) {
        let items = match self.backend.get_cart().await {
            Ok(cart) => cart.into_live_items(),
            Err(e) => {
                warn!(error = %e, "Cart fetch failed, showing an empty cart");
                Vec::new()
            }
        };
        debug!(lines = items.len(), "Cart mirror refreshed");
        *self.items.write().await = items;
    }
}
