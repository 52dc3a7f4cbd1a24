pub mod collection;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /collections                         list, create
/// /collections/export-csv              Format C export (GET)
/// /collections/import/bulk-upsert      Format A metadata import (POST)
/// /collections/upload-csv              Format B membership import (POST)
/// /collections/{id}                    get, replace, delete
/// /collections/{id}/products           resolved membership (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/collections", collection::router())
}
