//! HTTP handler functions, grouped by concern.

pub mod bulk_transfer;
pub mod collection;
