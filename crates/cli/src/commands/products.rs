//! Catalog commands.

use std::path::PathBuf;

use shopfront_core::{Price, Product, ProductId};
use shopfront_storefront::ApiClient;
use shopfront_storefront::api::{ImageFile, NewProduct, ProductFilter, ProductImage};

use super::{CommandError, money};

/// Raw `products create` arguments.
#[derive(Debug, Default)]
pub struct CreateInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub quantity: Option<u32>,
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub image_file: Option<PathBuf>,
    pub image_url: Option<String>,
}

impl CreateInput {
    fn into_new_product(self) -> Result<NewProduct, CommandError> {
        let price = self.price.as_deref().map(str::parse::<Price>).transpose()?;
        let file = self.image_file.map(ImageFile::from_path).transpose()?;

        Ok(NewProduct {
            name: self.name,
            description: self.description,
            price,
            quantity: self.quantity,
            category: self.category,
            featured: self.featured,
            image: ProductImage {
                file,
                url: self.image_url,
            },
        })
    }
}

/// List products.
pub async fn list(api: &ApiClient, featured: bool) -> Result<(), CommandError> {
    let products = api.list_products(ProductFilter { featured }).await?;

    #[allow(clippy::print_stdout)]
    {
        if products.is_empty() {
            println!("No products");
        }
        for product in &products {
            println!(
                "{:>6}  {:<40} {:>10}  {}",
                product.id,
                product.name,
                product.price.to_string(),
                stock_label(product)
            );
        }
    }
    Ok(())
}

/// Show one product.
pub async fn show(api: &ApiClient, id: ProductId) -> Result<(), CommandError> {
    let product = api.get_product(id).await?;
    print_product(&product);
    Ok(())
}

/// Create a product.
pub async fn create(api: &ApiClient, input: CreateInput) -> Result<(), CommandError> {
    let product = api.create_product(&input.into_new_product()?).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("Created product {}", product.id);
    }
    print_product(&product);
    Ok(())
}

fn stock_label(product: &Product) -> String {
    if product.in_stock() {
        format!("{} in stock", product.quantity)
    } else {
        "out of stock".to_string()
    }
}

#[allow(clippy::print_stdout)]
fn print_product(product: &Product) {
    println!("{} (#{})", product.name, product.id);
    println!("  Price: {}", money(product.price.amount()));
    println!("  Stock: {}", stock_label(product));
    if let Some(category) = &product.category {
        println!("  Category: {category}");
    }
    if product.featured {
        println!("  Featured");
    }
    if let Some(image) = &product.image_url {
        println!("  Image: {image}");
    }
    if !product.description.is_empty() {
        println!();
        println!("{}", product.description);
    }
}
