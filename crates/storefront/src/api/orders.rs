//! Order placement and history.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use shopfront_core::{Order, OrderId, ProductId};
use tracing::{info, instrument};

use super::ApiClient;
use crate::error::ApiError;

/// A requested order line.
///
/// Accepts the product reference under either `productId` or `product_id`;
/// the camel-case spelling wins when both are present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct OrderLineInput {
    #[serde(default, rename = "productId")]
    pub product_id_camel: Option<ProductId>,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    pub quantity: u32,
}

impl OrderLineInput {
    #[must_use]
    pub const fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id_camel: None,
            product_id: Some(product_id),
            quantity,
        }
    }

    /// The product this line refers to, whichever spelling supplied it.
    #[must_use]
    pub fn resolved_product_id(&self) -> Option<ProductId> {
        self.product_id_camel.or(self.product_id)
    }
}

/// Wire shape of an order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
struct OrderLine {
    #[serde(rename = "productId")]
    product_id: ProductId,
    quantity: u32,
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest {
    items: Vec<OrderLine>,
}

fn normalize(lines: &[OrderLineInput]) -> Result<Vec<OrderLine>, ApiError> {
    lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            line.resolved_product_id()
                .map(|product_id| OrderLine {
                    product_id,
                    quantity: line.quantity,
                })
                .ok_or_else(|| {
                    ApiError::InvalidRequest(format!("order line {index} has no product id"))
                })
        })
        .collect()
}

impl ApiClient {
    /// Place an order from explicit lines.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if a line lacks a product reference, before
    /// anything is sent. Backend rejections (insufficient stock) surface as
    /// `Validation`.
    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn create_order(&self, lines: &[OrderLineInput]) -> Result<Order, ApiError> {
        let body = CreateOrderRequest {
            items: normalize(lines)?,
        };
        let order: Order = self
            .send_json(self.request(Method::POST, "/api/orders").json(&body))
            .await?;

        info!(order_id = %order.id, total = %order.price, "Placed order");
        Ok(order)
    }

    /// The caller's order history.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not decode.
    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<Order>, ApiError> {
        self.send_json(self.request(Method::GET, "/api/orders"))
            .await
    }

    /// A single order.
    ///
    /// # Errors
    ///
    /// Returns `Validation` with status 404 if the order does not exist.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn get_order(&self, id: OrderId) -> Result<Order, ApiError> {
        self.send_json(self.request(Method::GET, &format!("/api/orders/{id}")))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_both_spellings_normalize() {
        let lines: Vec<OrderLineInput> = serde_json::from_str(
            r#"[{"productId": 1, "quantity": 2}, {"product_id": 5, "quantity": 1}]"#,
        )
        .unwrap();

        let body = serde_json::to_value(CreateOrderRequest {
            items: normalize(&lines).unwrap(),
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"items": [
                {"productId": 1, "quantity": 2},
                {"productId": 5, "quantity": 1}
            ]})
        );
    }

    #[test]
    fn test_camel_case_wins() {
        let line: OrderLineInput =
            serde_json::from_str(r#"{"productId": 3, "product_id": 4, "quantity": 1}"#).unwrap();
        assert_eq!(line.resolved_product_id(), Some(ProductId::new(3)));
    }

    #[test]
    fn test_missing_product_is_rejected() {
        let lines = [
            OrderLineInput::new(ProductId::new(1), 1),
            OrderLineInput {
                quantity: 2,
                ..OrderLineInput::default()
            },
        ];
        let err = normalize(&lines).unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(msg) if msg.contains("line 1")));
    }
}
