//! Order commands.

use shopfront_core::{Order, OrderId};
use shopfront_storefront::ApiClient;
use shopfront_storefront::api::OrderLineInput;

use super::{CommandError, OrderLineArg, money};

/// Place an order from explicit lines.
pub async fn create(api: &ApiClient, items: &[OrderLineArg]) -> Result<(), CommandError> {
    let lines: Vec<OrderLineInput> = items
        .iter()
        .map(|item| OrderLineInput::new(item.product_id, item.quantity))
        .collect();
    let order = api.create_order(&lines).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("Placed order #{}", order.id);
    }
    print_order(&order);
    Ok(())
}

/// List the caller's orders.
pub async fn list(api: &ApiClient) -> Result<(), CommandError> {
    let orders = api.list_orders().await?;

    #[allow(clippy::print_stdout)]
    {
        if orders.is_empty() {
            println!("No orders yet");
        }
        for order in &orders {
            println!(
                "#{:<6} {:<10} {:>4} units  {}",
                order.id,
                order.status,
                order.unit_count(),
                money(order.price)
            );
        }
    }
    Ok(())
}

/// Show one order.
pub async fn show(api: &ApiClient, id: OrderId) -> Result<(), CommandError> {
    let order = api.get_order(id).await?;
    print_order(&order);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_order(order: &Order) {
    println!("Order #{} ({})", order.id, order.status);
    if let Some(created_at) = order.created_at {
        println!("  Placed: {}", created_at.format("%Y-%m-%d %H:%M"));
    }
    for item in &order.items {
        let price = item
            .price
            .map_or_else(|| "-".to_string(), |p| p.to_string());
        println!("  product {:<6} x{:<4} {}", item.product_id, item.quantity, price);
    }
    println!("  Total: {}", money(order.price));
}
