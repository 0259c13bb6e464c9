//! Shopping cart records and derived aggregates.
//!
//! The backend computes authoritative totals. [`cart_total`] and
//! [`cart_item_count`] exist for display only and must never be sent back.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CartId, CartItemId, Price, ProductId};

/// A line in the shopper's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Cart line ID (used for update/remove).
    pub id: CartItemId,
    /// Referenced product.
    pub product_id: ProductId,
    /// Product name at the time of the fetch.
    #[serde(default)]
    pub name: String,
    /// Product description.
    #[serde(default)]
    pub description: String,
    /// Unit price. Missing on malformed lines.
    #[serde(default)]
    pub price: Option<Price>,
    /// Units of the product. Missing on malformed lines.
    #[serde(default)]
    pub quantity: Option<u32>,
    /// Image URL.
    #[serde(default, alias = "image_url")]
    pub image: Option<String>,
}

impl CartItem {
    /// Unit price times quantity; a missing value contributes zero.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        match (self.price, self.quantity) {
            (Some(price), Some(quantity)) => price.times(quantity),
            _ => Decimal::ZERO,
        }
    }
}

/// The server-side cart as returned by `GET /api/cart`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Cart ID.
    pub id: CartId,
    /// Lines in the cart, in no particular order.
    #[serde(default)]
    pub items: Vec<CartItem>,
    /// Server-computed total.
    #[serde(default)]
    pub total_price: Decimal,
    /// When the cart was opened.
    #[serde(default, deserialize_with = "super::timestamp::deserialize_option")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Cart {
    /// Consume the cart, keeping only lines that are still in it.
    ///
    /// A line whose quantity reached zero is gone from the cart even if a
    /// stale response still lists it.
    #[must_use]
    pub fn into_live_items(self) -> Vec<CartItem> {
        self.items
            .into_iter()
            .filter(|item| item.quantity != Some(0))
            .collect()
    }
}

/// Sum of `price * quantity` over all lines. Missing values count as zero.
#[must_use]
pub fn cart_total(items: &[CartItem]) -> Decimal {
    items.iter().map(CartItem::subtotal).sum()
}

/// Sum of quantities over all lines. Missing quantities count as zero.
#[must_use]
pub fn cart_item_count(items: &[CartItem]) -> u64 {
    items
        .iter()
        .map(|item| u64::from(item.quantity.unwrap_or(0)))
        .sum()
}
