//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - Write-side DTOs used by the repositories

pub mod collection;
pub mod product;
