//! Handlers for collection CRUD and the rule editor round trip.
//!
//! Submissions carry the editor's flat rule rows; the normalized rule
//! set is produced server-side via [`storefront_core::rules::collapse`]
//! and persisted as JSONB. Reads expand the stored set back to rows for
//! the editor. Collapse anomalies (rows the normalized form cannot
//! express) never block a save; they are logged and returned as
//! warnings next to the result.

use std::collections::HashSet;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use storefront_core::collection::{validate_name, validate_sort_order, CollectionType};
use storefront_core::error::{AnomalyWarning, CoreError};
use storefront_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use storefront_core::rules::{collapse, expand, FlatRuleRow, RuleSet};
use storefront_core::types::{DbId, ProductId};
use storefront_db::models::collection::{Collection, CollectionFields};
use storefront_db::models::product::Product;
use storefront_db::repositories::{CollectionRepo, MembershipRepo, ProductRepo};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Query parameters for listing collections.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Full collection submission (create and update share it; updates are
/// full replace, not patch). `rules` holds the editor's flat rows and
/// is only honored in automated mode; `products` only in manual mode.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitCollectionRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub seo_title: String,
    #[serde(default)]
    pub seo_description: String,
    pub is_visible: bool,
    pub collection_type: String,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub rules: Vec<FlatRuleRow>,
    #[serde(default)]
    pub products: Vec<ProductId>,
    pub image_url: Option<String>,
    pub image_alt_text: Option<String>,
}

/// Result of a submission: the stored row plus any collapse warnings.
#[derive(Debug, Serialize)]
pub struct SubmitCollectionResponse {
    pub collection: Collection,
    pub warnings: Vec<AnomalyWarning>,
}

/// Listing payload with the total for pagination.
#[derive(Debug, Serialize)]
pub struct CollectionListResponse {
    pub collections: Vec<Collection>,
    pub total: i64,
}

/// One collection with its editor-facing projections: manual product
/// ids in position order, and the rule set expanded to flat rows.
#[derive(Debug, Serialize)]
pub struct CollectionDetail {
    pub collection: Collection,
    pub product_ids: Vec<ProductId>,
    pub rule_rows: Vec<FlatRuleRow>,
}

/// One entry of the bulk product lookup. `product` is `None` when the
/// id does not resolve; transport failures abort the whole request
/// instead of being folded into a silent skip.
#[derive(Debug, Serialize)]
pub struct ProductLookup {
    pub id: ProductId,
    pub product: Option<Product>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Verify that a collection exists, returning the full row.
async fn ensure_collection_exists(pool: &sqlx::PgPool, id: DbId) -> AppResult<Collection> {
    CollectionRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Collection",
                id,
            })
        })
}

/// Validate a submission and build the write-side field set.
///
/// In automated mode the flat rows collapse into the normalized rule
/// set (any aborting validation error propagates); in manual mode the
/// rule set is cleared. Returns the fields, the mode, and any collapse
/// warnings.
fn build_fields(
    input: &SubmitCollectionRequest,
) -> AppResult<(CollectionFields, CollectionType, Vec<AnomalyWarning>)> {
    validate_name(&input.name).map_err(AppError::BadRequest)?;
    validate_sort_order(input.sort_order).map_err(AppError::BadRequest)?;

    let mode = CollectionType::from_str(&input.collection_type).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Invalid collection type '{}'. Must be one of: {}",
            input.collection_type,
            CollectionType::ALL.join(", ")
        ))
    })?;

    let (rules, warnings) = match mode {
        CollectionType::Automated => {
            let (rule_set, warnings) = collapse(&input.rules)?;
            let value = serde_json::to_value(&rule_set)
                .map_err(|e| AppError::InternalError(format!("Rule set serialization: {e}")))?;
            (Some(value), warnings)
        }
        CollectionType::Manual => (None, Vec::new()),
    };

    for warning in &warnings {
        tracing::warn!(
            row = warning.row,
            field = %warning.field,
            comparator = %warning.comparator,
            "Dropped unrepresentable rule row during collapse"
        );
    }

    let fields = CollectionFields {
        name: input.name.trim().to_string(),
        description: input.description.clone(),
        seo_title: input.seo_title.clone(),
        seo_description: input.seo_description.clone(),
        is_visible: input.is_visible,
        sort_order: input.sort_order,
        image_url: input.image_url.clone(),
        image_alt_text: input.image_alt_text.clone(),
        collection_type: mode.as_str().to_string(),
        rules,
    };

    Ok((fields, mode, warnings))
}

/// The authoritative product list of a submission: the submitted ids
/// in manual mode, nothing in automated mode.
fn member_ids_for_mode(mode: CollectionType, products: &[ProductId]) -> &[ProductId] {
    match mode {
        CollectionType::Manual => products,
        CollectionType::Automated => &[],
    }
}

/// Requested ids absent from the known set, input order.
fn missing_ids<'a>(requested: &'a [ProductId], known: &HashSet<ProductId>) -> Vec<&'a str> {
    requested
        .iter()
        .filter(|id| !known.contains(*id))
        .map(String::as_str)
        .collect()
}

/// Reject a submission referencing unknown products. Runs before any
/// write so a bad reference leaves nothing behind.
async fn ensure_products_exist(
    pool: &sqlx::PgPool,
    product_ids: &[ProductId],
) -> AppResult<()> {
    if product_ids.is_empty() {
        return Ok(());
    }
    let known: HashSet<ProductId> = ProductRepo::filter_existing(pool, product_ids)
        .await?
        .into_iter()
        .collect();
    let missing = missing_ids(product_ids, &known);
    if !missing.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Unknown product id(s): {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

/// Expand a stored rule set (JSONB) back into editor rows.
fn expand_stored_rules(collection: &Collection) -> AppResult<Vec<FlatRuleRow>> {
    match &collection.rules {
        Some(value) => {
            let rule_set: RuleSet = serde_json::from_value(value.clone()).map_err(|e| {
                AppError::InternalError(format!(
                    "Stored rules for collection {} do not parse: {e}",
                    collection.id
                ))
            })?;
            Ok(expand(&rule_set))
        }
        None => Ok(Vec::new()),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /collections?search=&limit=&offset=
///
/// List collections in canonical order. This is the explicit refresh
/// point for the listing screen.
pub async fn list_collections(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<impl IntoResponse> {
    let limit = clamp_limit(params.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
    let offset = clamp_offset(params.offset);
    let search = params.search.as_deref().filter(|s| !s.trim().is_empty());

    let collections = CollectionRepo::list(&state.pool, search, limit, offset).await?;
    let total = CollectionRepo::count(&state.pool, search).await?;

    Ok(Json(DataResponse {
        data: CollectionListResponse { collections, total },
    }))
}

/// POST /collections
///
/// Create a collection from a full submission. Product ids are checked
/// up front; the insert and the membership rows land in one
/// transaction, so a rejected submission writes nothing.
pub async fn create_collection(
    State(state): State<AppState>,
    Json(input): Json<SubmitCollectionRequest>,
) -> AppResult<impl IntoResponse> {
    let (fields, mode, warnings) = build_fields(&input)?;
    let member_ids = member_ids_for_mode(mode, &input.products);
    ensure_products_exist(&state.pool, member_ids).await?;

    let collection = CollectionRepo::create_with_members(&state.pool, &fields, member_ids).await?;

    tracing::info!(
        collection_id = collection.id,
        name = %collection.name,
        collection_type = %collection.collection_type,
        "Collection created"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: SubmitCollectionResponse {
                collection,
                warnings,
            },
        }),
    ))
}

/// GET /collections/{id}
///
/// Fetch one collection with editor projections.
pub async fn get_collection(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let collection = ensure_collection_exists(&state.pool, id).await?;
    let product_ids = MembershipRepo::list_product_ids(&state.pool, id).await?;
    let rule_rows = expand_stored_rules(&collection)?;

    Ok(Json(DataResponse {
        data: CollectionDetail {
            collection,
            product_ids,
            rule_rows,
        },
    }))
}

/// PUT /collections/{id}
///
/// Replace a collection wholesale (full replace semantics, not patch).
/// Like creation, validation precedes the single transactional write.
pub async fn update_collection(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SubmitCollectionRequest>,
) -> AppResult<impl IntoResponse> {
    let (fields, mode, warnings) = build_fields(&input)?;
    let member_ids = member_ids_for_mode(mode, &input.products);
    ensure_products_exist(&state.pool, member_ids).await?;

    let collection = CollectionRepo::replace_with_members(&state.pool, id, &fields, member_ids)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Collection",
                id,
            })
        })?;

    tracing::info!(collection_id = id, name = %collection.name, "Collection replaced");

    Ok(Json(DataResponse {
        data: SubmitCollectionResponse {
            collection,
            warnings,
        },
    }))
}

/// DELETE /collections/{id}
pub async fn delete_collection(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let deleted = CollectionRepo::delete(&state.pool, id).await?;
    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Collection",
            id,
        }));
    }

    tracing::info!(collection_id = id, "Collection deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /collections/{id}/products
///
/// Enrich a manual collection's membership with product data. One
/// result per id in position order; unresolved ids come back with
/// `product: null` rather than being dropped.
pub async fn get_collection_products(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ensure_collection_exists(&state.pool, id).await?;

    let product_ids = MembershipRepo::list_product_ids(&state.pool, id).await?;
    let looked_up = ProductRepo::find_by_ids(&state.pool, &product_ids).await?;

    let products: Vec<ProductLookup> = looked_up
        .into_iter()
        .map(|(id, product)| ProductLookup { id, product })
        .collect();

    let missing = products.iter().filter(|p| p.product.is_none()).count();
    if missing > 0 {
        tracing::warn!(
            collection_id = id,
            missing,
            "Collection references products that no longer resolve"
        );
    }

    Ok(Json(DataResponse { data: products }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use storefront_core::rules::{RuleComparator, RuleField};

    fn submission(collection_type: &str) -> SubmitCollectionRequest {
        SubmitCollectionRequest {
            name: "Summer".into(),
            description: String::new(),
            seo_title: String::new(),
            seo_description: String::new(),
            is_visible: true,
            collection_type: collection_type.into(),
            sort_order: 0,
            rules: Vec::new(),
            products: Vec::new(),
            image_url: None,
            image_alt_text: None,
        }
    }

    #[test]
    fn automated_mode_clears_member_list() {
        let ids = vec!["p-1".to_string(), "p-2".to_string()];
        assert!(member_ids_for_mode(CollectionType::Automated, &ids).is_empty());
        assert_eq!(member_ids_for_mode(CollectionType::Manual, &ids), &ids[..]);
    }

    #[test]
    fn missing_ids_reported_in_input_order() {
        let requested = vec!["p-1".to_string(), "p-2".to_string(), "p-3".to_string()];
        let known: HashSet<String> = std::iter::once("p-2".to_string()).collect();
        assert_eq!(missing_ids(&requested, &known), vec!["p-1", "p-3"]);
    }

    #[test]
    fn unknown_collection_type_rejected() {
        let err = build_fields(&submission("smart")).unwrap_err();
        assert_matches!(err, AppError::BadRequest(msg) => {
            assert!(msg.contains("smart"));
        });
    }

    #[test]
    fn blank_name_rejected() {
        let mut input = submission("manual");
        input.name = "   ".into();
        assert_matches!(build_fields(&input), Err(AppError::BadRequest(_)));
    }

    #[test]
    fn manual_mode_stores_no_rules() {
        let (fields, mode, warnings) = build_fields(&submission("manual")).unwrap();
        assert_eq!(mode, CollectionType::Manual);
        assert!(fields.rules.is_none());
        assert!(warnings.is_empty());
    }

    #[test]
    fn automated_mode_collapses_rules() {
        let mut input = submission("automated");
        input.rules = vec![FlatRuleRow::new(
            RuleField::Vendor,
            RuleComparator::IsEqualTo,
            "Acme",
        )];
        let (fields, mode, warnings) = build_fields(&input).unwrap();
        assert_eq!(mode, CollectionType::Automated);
        assert!(warnings.is_empty());
        assert_eq!(fields.rules.unwrap()["vendor"], "Acme");
    }

    #[test]
    fn automated_mode_surfaces_collapse_warnings() {
        let mut input = submission("automated");
        input.rules = vec![FlatRuleRow::new(
            RuleField::Vendor,
            RuleComparator::IsNotEqualTo,
            "Acme",
        )];
        let (_, _, warnings) = build_fields(&input).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].comparator, "is_not_equal_to");
    }

    #[test]
    fn automated_mode_inverted_range_rejected() {
        let mut input = submission("automated");
        input.rules = vec![
            FlatRuleRow::new(RuleField::PriceRange, RuleComparator::IsGreaterThan, "10"),
            FlatRuleRow::new(RuleField::PriceRange, RuleComparator::IsLessThan, "5"),
        ];
        assert_matches!(build_fields(&input), Err(AppError::Validation(_)));
    }
}
