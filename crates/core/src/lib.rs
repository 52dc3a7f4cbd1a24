//! Domain logic for the storefront collections admin service.
//!
//! This crate has zero I/O and zero async. It provides:
//!
//! - The collection rule model and its bidirectional flat-row mapping
//! - The CSV bulk import/export contract (parse, validate, serialize)
//! - Collection field validation and membership mode enums
//! - The shared error taxonomy (`ValidationError`, `RowError`, warnings)
//!
//! The `db` and `api` crates build on these types; nothing here touches
//! the database or the network.

pub mod bulk_transfer;
pub mod collection;
pub mod csv;
pub mod error;
pub mod pagination;
pub mod rules;
pub mod types;
