//! Catalog reads and product creation.

use std::path::Path;

use reqwest::Method;
use reqwest::multipart::{Form, Part};
use shopfront_core::{Price, Product, ProductId};
use tracing::{debug, info, instrument};

use super::ApiClient;
use super::cache::{CacheKey, CacheValue};
use crate::error::ApiError;

/// Catalog listing filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ProductFilter {
    /// Only featured products.
    pub featured: bool,
}

impl ProductFilter {
    /// Filter selecting featured products.
    #[must_use]
    pub const fn featured() -> Self {
        Self { featured: true }
    }

    fn path(self) -> &'static str {
        if self.featured {
            "/api/products?featured=true"
        } else {
            "/api/products"
        }
    }
}

/// An uploaded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    /// Read an image from disk, guessing the MIME type from the extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map_or_else(|| "image".to_string(), |n| n.to_string_lossy().into_owned());

        Ok(Self {
            mime_type: mime_for(path).to_string(),
            file_name,
            bytes,
        })
    }
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Image attached to a new product: an uploaded file, a remote URL, both, or
/// neither.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductImage {
    pub file: Option<ImageFile>,
    pub url: Option<String>,
}

/// Admin input for creating a product. Absent fields are omitted from the
/// submission entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub quantity: Option<u32>,
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub image: ProductImage,
}

/// A single multipart field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue<'a> {
    Text(String),
    File(&'a ImageFile),
}

impl NewProduct {
    /// The fields that will be submitted, in submission order.
    ///
    /// Blank strings count as absent.
    #[must_use]
    pub fn form_fields(&self) -> Vec<(&'static str, FormValue<'_>)> {
        let mut fields = Vec::new();
        let mut text = |name: &'static str, value: Option<String>| {
            if let Some(value) = value {
                fields.push((name, FormValue::Text(value)));
            }
        };

        text("name", present(self.name.as_deref()));
        text("description", present(self.description.as_deref()));
        text("price", self.price.map(|p| p.amount().to_string()));
        text("quantity", self.quantity.map(|q| q.to_string()));
        text("category", present(self.category.as_deref()));
        text("featured", self.featured.map(|f| f.to_string()));
        text("imageUrl", present(self.image.url.as_deref()));

        if let Some(file) = &self.image.file {
            fields.push(("image", FormValue::File(file)));
        }
        fields
    }

    fn to_form(&self) -> Result<Form, ApiError> {
        self.form_fields()
            .into_iter()
            .try_fold(Form::new(), |form, (name, value)| match value {
                FormValue::Text(text) => Ok(form.text(name, text)),
                FormValue::File(file) => {
                    let part = Part::bytes(file.bytes.clone())
                        .file_name(file.file_name.clone())
                        .mime_str(&file.mime_type)
                        .map_err(|e| {
                            ApiError::InvalidRequest(format!(
                                "invalid image type {}: {e}",
                                file.mime_type
                            ))
                        })?;
                    Ok(form.part(name, part))
                }
            })
    }
}

fn present(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

impl ApiClient {
    /// List catalog products.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not decode.
    #[instrument(skip(self), fields(featured = filter.featured))]
    pub async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>, ApiError> {
        let key = CacheKey::Products {
            featured: filter.featured,
        };
        if let Some(CacheValue::Products(products)) = self.cache_get(&key).await {
            return Ok(products);
        }

        let products: Vec<Product> = self
            .send_json(self.request(Method::GET, filter.path()))
            .await?;
        debug!(count = products.len(), "Fetched products");

        self.cache_put(key, CacheValue::Products(products.clone()))
            .await;
        Ok(products)
    }

    /// Fetch a single product.
    ///
    /// # Errors
    ///
    /// Returns `Validation` with status 404 if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, ApiError> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.cache_get(&key).await {
            return Ok(*product);
        }

        let product: Product = self
            .send_json(self.request(Method::GET, &format!("/api/products/{id}")))
            .await?;

        self.cache_put(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// Create a product as a multipart form submission.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the backend rejects the submission (missing
    /// required fields, non-admin caller).
    #[instrument(skip(self, product), fields(name = ?product.name))]
    pub async fn create_product(&self, product: &NewProduct) -> Result<Product, ApiError> {
        let form = product.to_form()?;
        let created: Product = self
            .send_json(self.request(Method::POST, "/api/products").multipart(form))
            .await?;

        self.invalidate_products();
        info!(product_id = %created.id, "Created product");
        Ok(created)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn names(product: &NewProduct) -> Vec<&'static str> {
        product.form_fields().into_iter().map(|(n, _)| n).collect()
    }

    #[test]
    fn test_only_present_fields_are_submitted() {
        let product = NewProduct {
            name: Some("Mug".to_string()),
            price: Some(Price::from_str("12.50").unwrap()),
            ..NewProduct::default()
        };

        let fields = product.form_fields();
        assert_eq!(
            fields,
            vec![
                ("name", FormValue::Text("Mug".to_string())),
                ("price", FormValue::Text("12.50".to_string())),
            ]
        );
    }

    #[test]
    fn test_blank_strings_are_omitted() {
        let product = NewProduct {
            name: Some("Mug".to_string()),
            description: Some("   ".to_string()),
            category: Some(String::new()),
            image: ProductImage {
                file: None,
                url: Some(String::new()),
            },
            ..NewProduct::default()
        };
        assert_eq!(names(&product), vec!["name"]);
    }

    #[test]
    fn test_featured_false_is_still_sent() {
        let product = NewProduct {
            featured: Some(false),
            quantity: Some(0),
            ..NewProduct::default()
        };
        assert_eq!(
            product.form_fields(),
            vec![
                ("quantity", FormValue::Text("0".to_string())),
                ("featured", FormValue::Text("false".to_string())),
            ]
        );
    }

    #[test]
    fn test_file_and_url_both_sent() {
        let product = NewProduct {
            name: Some("Poster".to_string()),
            image: ProductImage {
                file: Some(ImageFile {
                    file_name: "poster.png".to_string(),
                    mime_type: "image/png".to_string(),
                    bytes: vec![0x89, b'P', b'N', b'G'],
                }),
                url: Some("https://cdn.example.com/poster.png".to_string()),
            },
            ..NewProduct::default()
        };
        assert_eq!(names(&product), vec!["name", "imageUrl", "image"]);
        assert!(product.to_form().is_ok());
    }

    #[test]
    fn test_image_from_path_sets_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.JPG");
        std::fs::write(&path, b"jpeg bytes").unwrap();

        let image = ImageFile::from_path(&path).unwrap();
        assert_eq!(image.file_name, "photo.JPG");
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.bytes, b"jpeg bytes");
    }

    #[test]
    fn test_unknown_extension_is_octet_stream() {
        assert_eq!(mime_for(Path::new("data.bin")), "application/octet-stream");
        assert_eq!(mime_for(Path::new("noext")), "application/octet-stream");
        assert_eq!(mime_for(Path::new("a.webp")), "image/webp");
    }

    #[test]
    fn test_filter_path() {
        assert_eq!(ProductFilter::default().path(), "/api/products");
        assert_eq!(
            ProductFilter::featured().path(),
            "/api/products?featured=true"
        );
    }
}
