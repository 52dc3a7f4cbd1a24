//! Route definitions for collections and the CSV bulk transfer contract.
//!
//! ```text
//! GET    /                      list_collections
//! POST   /                      create_collection
//! GET    /export-csv            export_collections (Format C)
//! POST   /import/bulk-upsert    import_collections (Format A)
//! POST   /upload-csv            import_membership (Format B)
//! GET    /{id}                  get_collection
//! PUT    /{id}                  update_collection
//! DELETE /{id}                  delete_collection
//! GET    /{id}/products         get_collection_products
//! ```

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use storefront_core::csv::MAX_UPLOAD_BYTES;

use crate::handlers::{bulk_transfer, collection};
use crate::state::AppState;

/// Collection routes — mounted at `/collections`.
///
/// The upload routes raise the body limit above the CSV ceiling so the
/// size gate in `storefront_core::csv` is the one that rejects
/// oversized files, with the contract's own error shape. The extra
/// margin covers multipart framing overhead.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(collection::list_collections).post(collection::create_collection),
        )
        .route("/export-csv", get(bulk_transfer::export_collections))
        .route(
            "/import/bulk-upsert",
            post(bulk_transfer::import_collections)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024)),
        )
        .route(
            "/upload-csv",
            post(bulk_transfer::import_membership)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024)),
        )
        .route(
            "/{id}",
            get(collection::get_collection)
                .put(collection::update_collection)
                .delete(collection::delete_collection),
        )
        .route("/{id}/products", get(collection::get_collection_products))
}
