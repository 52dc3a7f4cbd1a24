//! Handlers for the CSV bulk transfer endpoints.
//!
//! Uploads arrive as multipart form data with a single `file` part.
//! The size ceiling and media type gate run before parsing; format
//! validation lives in `storefront_core::bulk_transfer`. Format A is
//! all-or-nothing; Format B applies valid rows and reports the rest.

use std::collections::HashSet;

use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use storefront_core::bulk_transfer::{
    serialize_export, validate_collection_upsert, validate_membership_import, MembershipRecord,
};
use storefront_core::csv;
use storefront_core::error::RowError;
use storefront_core::types::{DbId, ProductId};
use storefront_db::repositories::{CollectionRepo, MembershipRepo, ProductRepo};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Upload extraction
// ---------------------------------------------------------------------------

/// Pull the `file` part out of a multipart upload and run the size and
/// media type gates against it.
async fn read_csv_upload(mut multipart: Multipart) -> AppResult<Vec<u8>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        // The content type must be captured before the body is consumed.
        let media_type = field.content_type().unwrap_or("").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {e}")))?;

        csv::check_upload(data.len(), &media_type)?;
        return Ok(data.to_vec());
    }

    Err(AppError::BadRequest(
        "Multipart body must contain a 'file' part".to_string(),
    ))
}

// ---------------------------------------------------------------------------
// Format A: metadata import
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct UpsertSummary {
    pub imported: usize,
}

/// POST /collections/import/bulk-upsert
///
/// All-or-nothing metadata upsert keyed by collection name. Validation
/// failures reject the whole file, and the batch lands in a single
/// transaction, so a mid-batch failure writes nothing either.
pub async fn import_collections(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let data = read_csv_upload(multipart).await?;
    let table = csv::parse(&data)?;
    let rows = validate_collection_upsert(&table)?;

    CollectionRepo::upsert_batch_by_name(&state.pool, &rows).await?;

    tracing::info!(imported = rows.len(), "Collection metadata import applied");

    Ok(Json(DataResponse {
        data: UpsertSummary {
            imported: rows.len(),
        },
    }))
}

// ---------------------------------------------------------------------------
// Format B: membership import
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct MembershipImportSummary {
    pub total: usize,
    pub imported: usize,
    pub failed: usize,
    pub errors: Vec<RowError>,
}

/// Split shape-valid records into those whose ids resolve and per-row
/// errors for the rest.
async fn resolve_membership_ids(
    pool: &sqlx::PgPool,
    records: Vec<MembershipRecord>,
) -> AppResult<(Vec<MembershipRecord>, Vec<RowError>)> {
    let collection_ids: Vec<DbId> = {
        let unique: HashSet<DbId> = records.iter().map(|r| r.collection_id).collect();
        unique.into_iter().collect()
    };
    let product_ids: Vec<ProductId> = {
        let unique: HashSet<&str> = records.iter().map(|r| r.product_id.as_str()).collect();
        unique.into_iter().map(String::from).collect()
    };

    let known_collections: HashSet<DbId> = CollectionRepo::filter_existing_ids(pool, &collection_ids)
        .await?
        .into_iter()
        .collect();
    let known_products: HashSet<ProductId> = ProductRepo::filter_existing(pool, &product_ids)
        .await?
        .into_iter()
        .collect();

    let mut accepted = Vec::with_capacity(records.len());
    let mut errors = Vec::new();

    for record in records {
        if !known_collections.contains(&record.collection_id) {
            errors.push(RowError::new(
                record.row,
                format!(
                    "unresolved-id: collection_id '{}' does not exist",
                    record.collection_id
                ),
            ));
        } else if !known_products.contains(&record.product_id) {
            errors.push(RowError::new(
                record.row,
                format!(
                    "unresolved-id: product_id '{}' does not exist",
                    record.product_id
                ),
            ));
        } else {
            accepted.push(record);
        }
    }

    Ok((accepted, errors))
}

/// POST /collections/upload-csv
///
/// Per-row membership import: rows that fail shape validation or id
/// resolution are reported individually; the rest are applied in input
/// order, last write winning for a repeated (collection, product) pair.
pub async fn import_membership(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let data = read_csv_upload(multipart).await?;
    let table = csv::parse(&data)?;
    let total = table.rows.len();

    let validation = validate_membership_import(&table)?;
    let mut errors = validation.errors;

    let (accepted, unresolved) = resolve_membership_ids(&state.pool, validation.records).await?;
    errors.extend(unresolved);
    errors.sort_by_key(|e| e.row);

    MembershipRepo::apply(&state.pool, &accepted).await?;

    tracing::info!(
        total,
        imported = accepted.len(),
        failed = errors.len(),
        "Membership import applied"
    );

    Ok(Json(DataResponse {
        data: MembershipImportSummary {
            total,
            imported: accepted.len(),
            failed: errors.len(),
            errors,
        },
    }))
}

// ---------------------------------------------------------------------------
// Format C: export
// ---------------------------------------------------------------------------

/// GET /collections/export-csv
///
/// Stream the full collection set as a CSV attachment, canonical
/// listing order, one row per collection.
pub async fn export_collections(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let rows = CollectionRepo::list_for_export(&state.pool).await?;
    let body = serialize_export(&rows);

    tracing::info!(exported = rows.len(), "Collection export generated");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"collections.csv\"",
            ),
        ],
        body,
    ))
}
