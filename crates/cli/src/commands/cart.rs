//! Cart commands.

use shopfront_storefront::{ApiClient, CartManager};

use super::money;

/// Build a cart manager and load the current cart.
pub async fn load(api: &ApiClient) -> CartManager<ApiClient> {
    let cart = CartManager::new(api.clone());
    cart.initialize().await;
    cart
}

/// Print the cart with its derived totals.
#[allow(clippy::print_stdout)]
pub async fn print(cart: &CartManager<ApiClient>) {
    let snapshot = cart.snapshot().await;
    if snapshot.items.is_empty() {
        println!("Cart is empty");
        return;
    }

    for item in &snapshot.items {
        let price = item.price.map_or_else(|| "-".to_string(), |p| p.to_string());
        println!(
            "{:>6}  {:<40} x{:<4} {:>10}  {:>10}",
            item.id,
            item.name,
            item.quantity.unwrap_or_default(),
            price,
            money(item.subtotal())
        );
    }
    println!(
        "{} items, total {}",
        snapshot.item_count,
        money(snapshot.total_price)
    );
}
