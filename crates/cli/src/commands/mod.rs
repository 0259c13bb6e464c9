//! Subcommand implementations.

pub mod auth;
pub mod cart;
pub mod orders;
pub mod products;

use std::str::FromStr;

use rust_decimal::Decimal;
use shopfront_core::{EmailError, PriceError, ProductId};
use shopfront_storefront::{ApiError, LoginRedirect};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Invalid email address.
    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    /// Invalid price.
    #[error("Invalid price: {0}")]
    Price(#[from] PriceError),

    /// Image file could not be read.
    #[error("Cannot read image: {0}")]
    Image(#[from] std::io::Error),
}

/// Tells the user to sign in again after the backend rejected the session.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalRedirect;

impl LoginRedirect for TerminalRedirect {
    fn redirect_to_login(&self) {
        tracing::warn!("Session expired. Run `shopfront login` to sign in again.");
    }
}

/// An order line given as `<product>:<quantity>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLineArg {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl FromStr for OrderLineArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (product, quantity) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <product>:<quantity>, got {s:?}"))?;

        let product_id = product
            .parse()
            .map_err(|e| format!("invalid product id {product:?}: {e}"))?;
        let quantity = quantity
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid quantity {quantity:?}: {e}"))?;
        if quantity == 0 {
            return Err("quantity must be at least 1".to_string());
        }

        Ok(Self {
            product_id,
            quantity,
        })
    }
}

/// Format an amount as dollars with two decimals.
pub(crate) fn money(amount: Decimal) -> String {
    format!("${amount:.2}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_line_arg() {
        let line: OrderLineArg = "7:2".parse().unwrap();
        assert_eq!(line.product_id, ProductId::new(7));
        assert_eq!(line.quantity, 2);
    }

    #[test]
    fn test_order_line_arg_rejects_bad_input() {
        assert!("7".parse::<OrderLineArg>().is_err());
        assert!("x:2".parse::<OrderLineArg>().is_err());
        assert!("7:0".parse::<OrderLineArg>().is_err());
        assert!("7:-1".parse::<OrderLineArg>().is_err());
    }

    #[test]
    fn test_money() {
        assert_eq!(money(Decimal::new(25, 0)), "$25.00");
        assert_eq!(money(Decimal::new(1999, 2)), "$19.99");
    }
}
