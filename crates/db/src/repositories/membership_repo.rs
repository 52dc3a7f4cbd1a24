//! Repository for the `collection_products` table.

use sqlx::PgPool;
use storefront_core::bulk_transfer::MembershipRecord;
use storefront_core::types::{DbId, ProductId};

/// Manual membership operations.
pub struct MembershipRepo;

impl MembershipRepo {
    /// Apply validated Format B records one by one, in input order, so
    /// that a later row targeting the same (collection, product) pair
    /// wins. Rows are assumed to reference existing entities; resolve
    /// ids before calling.
    pub async fn apply(pool: &PgPool, records: &[MembershipRecord]) -> Result<(), sqlx::Error> {
        for record in records {
            sqlx::query(
                "INSERT INTO collection_products (collection_id, product_id, position)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (collection_id, product_id)
                 DO UPDATE SET position = EXCLUDED.position",
            )
            .bind(record.collection_id)
            .bind(&record.product_id)
            .bind(record.position)
            .execute(pool)
            .await?;
        }
        Ok(())
    }

    /// Product ids of a collection, position order.
    pub async fn list_product_ids(
        pool: &PgPool,
        collection_id: DbId,
    ) -> Result<Vec<ProductId>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT product_id FROM collection_products
             WHERE collection_id = $1
             ORDER BY position, product_id",
        )
        .bind(collection_id)
        .fetch_all(pool)
        .await
    }
}
