//! Repository for the `products` mirror table.

use std::collections::HashMap;

use sqlx::PgPool;
use storefront_core::types::ProductId;

use crate::models::product::Product;

const COLUMNS: &str =
    "id, title, vendor, product_type, tags, price, image_url, image_alt_text";

/// Lookup operations against the mirrored product catalog.
pub struct ProductRepo;

impl ProductRepo {
    /// Bulk lookup returning one entry per requested id, in request
    /// order. `None` means the id does not resolve; a transport failure
    /// surfaces as the outer `Err`. Callers can therefore tell the two
    /// apart instead of silently skipping.
    pub async fn find_by_ids(
        pool: &PgPool,
        ids: &[ProductId],
    ) -> Result<Vec<(ProductId, Option<Product>)>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!("SELECT {COLUMNS} FROM products WHERE id = ANY($1)");
        let found = sqlx::query_as::<_, Product>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await?;

        let mut by_id: HashMap<String, Product> =
            found.into_iter().map(|p| (p.id.clone(), p)).collect();

        Ok(ids
            .iter()
            .map(|id| (id.clone(), by_id.remove(id)))
            .collect())
    }

    /// Return the subset of `ids` that exist.
    pub async fn filter_existing(
        pool: &PgPool,
        ids: &[ProductId],
    ) -> Result<Vec<ProductId>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_scalar::<_, String>("SELECT id FROM products WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(pool)
            .await
    }
}
