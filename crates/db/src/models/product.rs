//! Product mirror model.

use serde::Serialize;
use sqlx::FromRow;
use storefront_core::types::ProductId;

/// A row from the `products` table: the locally mirrored slice of the
/// upstream catalog that collection screens need.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub vendor: String,
    pub product_type: String,
    pub tags: Vec<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub image_alt_text: Option<String>,
}
