/// Collection primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Product identifiers are opaque strings assigned by the upstream
/// product catalog (e.g. `gid://shopify/Product/123`).
pub type ProductId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
