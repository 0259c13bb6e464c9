//! Placed order records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{OrderId, OrderStatus, Price, ProductId, UserId};

/// A line of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Ordered product.
    #[serde(alias = "productId")]
    pub product_id: ProductId,
    /// Units ordered.
    pub quantity: u32,
    /// Unit price captured when the order was placed.
    #[serde(default)]
    pub price: Option<Price>,
}

/// An order as returned by the orders endpoints.
///
/// Different backend routes name the key and total differently
/// (`order_id`/`id`, `price`/`total_price`); both spellings are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Order ID.
    #[serde(alias = "order_id")]
    pub id: OrderId,
    /// Owning user.
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Ordered lines.
    #[serde(default)]
    pub items: Vec<OrderItem>,
    /// Order total as computed by the backend.
    #[serde(default, alias = "total_price")]
    pub price: Decimal,
    /// Lifecycle status.
    #[serde(default)]
    pub status: OrderStatus,
    /// When the order was placed.
    #[serde(default, deserialize_with = "super::timestamp::deserialize_option")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Total units across all lines.
    #[must_use]
    pub fn unit_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }
}
