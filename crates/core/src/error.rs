//! Shared error taxonomy.
//!
//! Three tiers, matching how failures propagate:
//!
//! - [`ValidationError`] aborts an entire operation (all-or-nothing).
//! - [`RowError`] is per-row and non-fatal; valid rows still apply.
//! - [`AnomalyWarning`] never aborts; it rides alongside a successful
//!   result so the caller can inform the user without blocking a save.

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// Domain-level error used across the service.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// Machine-readable category of a [`ValidationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationErrorKind {
    MalformedNumber,
    InvertedRange,
    FileTooLarge,
    WrongMediaType,
    MissingRequiredColumn,
}

impl ValidationErrorKind {
    /// Wire string as surfaced in error responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedNumber => "malformed-number",
            Self::InvertedRange => "inverted-range",
            Self::FileTooLarge => "file-too-large",
            Self::WrongMediaType => "wrong-media-type",
            Self::MissingRequiredColumn => "missing-required-column",
        }
    }
}

impl std::fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An aborting validation failure. The whole submission is rejected;
/// no partial result is produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[error("{kind}: {message}")]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub message: String,
}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// RowError
// ---------------------------------------------------------------------------

/// A per-row failure during bulk import. Carries the zero-based data row
/// index (header row excluded) and a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub row: usize,
    pub reason: String,
}

impl RowError {
    pub fn new(row: usize, reason: impl Into<String>) -> Self {
        Self {
            row,
            reason: reason.into(),
        }
    }
}

/// Either all rows validated, or the batch aborted.
///
/// `Rows` holds the collected per-row violations when a format requires
/// all-or-nothing semantics; `Validation` is a file-level failure raised
/// before (or instead of) per-row inspection.
#[derive(Debug, thiserror::Error)]
pub enum BulkError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{} row(s) failed validation", .0.len())]
    Rows(Vec<RowError>),
}

// ---------------------------------------------------------------------------
// AnomalyWarning
// ---------------------------------------------------------------------------

/// A non-fatal anomaly noticed during rule collapsing: the flat form
/// expressed something the normalized form cannot, and the offending row
/// was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnomalyWarning {
    /// Index of the offending flat rule row.
    pub row: usize,
    pub field: String,
    pub comparator: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_wire_strings_are_kebab_case() {
        assert_eq!(ValidationErrorKind::MalformedNumber.as_str(), "malformed-number");
        assert_eq!(ValidationErrorKind::InvertedRange.as_str(), "inverted-range");
        assert_eq!(ValidationErrorKind::FileTooLarge.as_str(), "file-too-large");
        assert_eq!(ValidationErrorKind::WrongMediaType.as_str(), "wrong-media-type");
        assert_eq!(
            ValidationErrorKind::MissingRequiredColumn.as_str(),
            "missing-required-column"
        );
    }

    #[test]
    fn validation_error_display_includes_kind() {
        let err = ValidationError::new(ValidationErrorKind::InvertedRange, "min 10 > max 5");
        assert_eq!(format!("{err}"), "inverted-range: min 10 > max 5");
    }

    #[test]
    fn kind_serializes_to_kebab_case() {
        let json = serde_json::to_string(&ValidationErrorKind::FileTooLarge).unwrap();
        assert_eq!(json, "\"file-too-large\"");
    }
}
