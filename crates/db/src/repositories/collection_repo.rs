//! Repository for the `collections` table.

use sqlx::PgPool;
use storefront_core::bulk_transfer::{CollectionExportRow, CollectionUpsertRow};
use storefront_core::types::{DbId, ProductId};

use crate::models::collection::{Collection, CollectionFields};

/// Column list for collections queries.
const COLUMNS: &str = "id, name, description, seo_title, seo_description, is_visible, \
    sort_order, image_url, image_alt_text, collection_type, rules, created_at, updated_at";

/// Provides CRUD and bulk operations for collections.
pub struct CollectionRepo;

impl CollectionRepo {
    /// Create a collection together with its manual product list, in
    /// one transaction. A submission is a single atomic unit: if any
    /// membership insert fails, nothing is persisted.
    pub async fn create_with_members(
        pool: &PgPool,
        input: &CollectionFields,
        product_ids: &[ProductId],
    ) -> Result<Collection, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO collections
                (name, description, seo_title, seo_description, is_visible, sort_order,
                 image_url, image_alt_text, collection_type, rules)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        let collection = sqlx::query_as::<_, Collection>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.seo_title)
            .bind(&input.seo_description)
            .bind(input.is_visible)
            .bind(input.sort_order)
            .bind(&input.image_url)
            .bind(&input.image_alt_text)
            .bind(&input.collection_type)
            .bind(&input.rules)
            .fetch_one(&mut *tx)
            .await?;

        set_members(&mut *tx, collection.id, product_ids).await?;
        tx.commit().await?;
        Ok(collection)
    }

    /// Find a collection by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Collection>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM collections WHERE id = $1");
        sqlx::query_as::<_, Collection>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List collections in canonical order (creation order), optionally
    /// filtered by a case-insensitive name substring.
    pub async fn list(
        pool: &PgPool,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Collection>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM collections
             WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%')
             ORDER BY id
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Collection>(&query)
            .bind(search)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Count collections matching the listing filter.
    pub async fn count(pool: &PgPool, search: Option<&str>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM collections
             WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%')",
        )
        .bind(search)
        .fetch_one(pool)
        .await
    }

    /// Replace every field of an existing collection (full replace, not
    /// patch) and its product list, in one transaction. Returns the
    /// updated row, or `None` (with nothing written) when the id does
    /// not exist.
    pub async fn replace_with_members(
        pool: &PgPool,
        id: DbId,
        input: &CollectionFields,
        product_ids: &[ProductId],
    ) -> Result<Option<Collection>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE collections SET
                name = $2, description = $3, seo_title = $4, seo_description = $5,
                is_visible = $6, sort_order = $7, image_url = $8, image_alt_text = $9,
                collection_type = $10, rules = $11, updated_at = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let Some(collection) = sqlx::query_as::<_, Collection>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.seo_title)
            .bind(&input.seo_description)
            .bind(input.is_visible)
            .bind(input.sort_order)
            .bind(&input.image_url)
            .bind(&input.image_alt_text)
            .bind(&input.collection_type)
            .bind(&input.rules)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        set_members(&mut *tx, id, product_ids).await?;
        tx.commit().await?;
        Ok(Some(collection))
    }

    /// Apply a validated Format A batch in one transaction, keyed by
    /// exact name. All rows commit together or none do. An existing
    /// collection gets a full-field replace of the imported columns;
    /// membership mode and rules are untouched.
    pub async fn upsert_batch_by_name(
        pool: &PgPool,
        rows: &[CollectionUpsertRow],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        for row in rows {
            sqlx::query(
                "INSERT INTO collections
                    (name, description, seo_title, seo_description, is_visible, sort_order)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT ON CONSTRAINT uq_collections_name DO UPDATE SET
                    description = EXCLUDED.description,
                    seo_title = EXCLUDED.seo_title,
                    seo_description = EXCLUDED.seo_description,
                    is_visible = EXCLUDED.is_visible,
                    sort_order = EXCLUDED.sort_order,
                    updated_at = now()",
            )
            .bind(&row.name)
            .bind(&row.description)
            .bind(&row.seo_title)
            .bind(&row.seo_description)
            .bind(row.is_visible)
            .bind(row.sort_order)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }

    /// Project all collections into export rows, canonical order.
    pub async fn list_for_export(pool: &PgPool) -> Result<Vec<CollectionExportRow>, sqlx::Error> {
        let rows = sqlx::query_as::<_, Collection>(&format!(
            "SELECT {COLUMNS} FROM collections ORDER BY id"
        ))
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|c| CollectionExportRow {
                name: c.name,
                description: c.description,
                is_visible: c.is_visible,
                sort_order: c.sort_order,
                seo_title: c.seo_title,
                created_at: c.created_at,
            })
            .collect())
    }

    /// Return the subset of `ids` that exist.
    pub async fn filter_existing_ids(
        pool: &PgPool,
        ids: &[DbId],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_scalar::<_, DbId>("SELECT id FROM collections WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Delete a collection. Returns whether a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM collections WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Replace a collection's membership rows inside an open transaction.
/// Positions follow the order of `product_ids`.
async fn set_members(
    conn: &mut sqlx::PgConnection,
    collection_id: DbId,
    product_ids: &[ProductId],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM collection_products WHERE collection_id = $1")
        .bind(collection_id)
        .execute(&mut *conn)
        .await?;

    for (position, product_id) in product_ids.iter().enumerate() {
        sqlx::query(
            "INSERT INTO collection_products (collection_id, product_id, position)
             VALUES ($1, $2, $3)
             ON CONFLICT (collection_id, product_id)
             DO UPDATE SET position = EXCLUDED.position",
        )
        .bind(collection_id)
        .bind(product_id)
        .bind(position as i32)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}
