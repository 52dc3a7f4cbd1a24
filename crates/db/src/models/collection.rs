//! Collection model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use storefront_core::types::{DbId, Timestamp};

/// A row from the `collections` table.
///
/// `rules` holds the normalized rule set as JSONB and is only present
/// when `collection_type` is `automated`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Collection {
    pub id: DbId,
    pub name: String,
    pub description: String,
    pub seo_title: String,
    pub seo_description: String,
    pub is_visible: bool,
    pub sort_order: i32,
    pub image_url: Option<String>,
    pub image_alt_text: Option<String>,
    pub collection_type: String,
    pub rules: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Full field set for a collection write. Submissions replace the whole
/// row (full replace semantics, not patch), so create and replace share
/// this DTO.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionFields {
    pub name: String,
    pub description: String,
    pub seo_title: String,
    pub seo_description: String,
    pub is_visible: bool,
    pub sort_order: i32,
    pub image_url: Option<String>,
    pub image_alt_text: Option<String>,
    pub collection_type: String,
    pub rules: Option<serde_json::Value>,
}
