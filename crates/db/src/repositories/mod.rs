//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod collection_repo;
pub mod membership_repo;
pub mod product_repo;

pub use collection_repo::CollectionRepo;
pub use membership_repo::MembershipRepo;
pub use product_repo::ProductRepo;
