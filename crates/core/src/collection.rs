//! Collection membership modes and field validation.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Membership mode
// ---------------------------------------------------------------------------

/// How a collection's members are determined. The mode decides which of
/// {product list, rule set} is authoritative; the other is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionType {
    /// Products are attached one by one, with explicit positions.
    Manual,
    /// Membership derives from a stored rule set.
    Automated,
}

impl CollectionType {
    /// Return the mode name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Automated => "automated",
        }
    }

    /// Parse a mode string. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(Self::Manual),
            "automated" => Some(Self::Automated),
            _ => None,
        }
    }

    pub const ALL: &'static [&'static str] = &["manual", "automated"];
}

impl std::fmt::Display for CollectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Field validation
// ---------------------------------------------------------------------------

/// Maximum length of a collection display name.
pub const MAX_NAME_LENGTH: usize = 255;

/// Validate a collection display name: required, non-empty after
/// trimming, within length limits.
pub fn validate_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Collection name cannot be empty".to_string());
    }
    if trimmed.len() > MAX_NAME_LENGTH {
        return Err(format!(
            "Collection name exceeds maximum length of {MAX_NAME_LENGTH} characters"
        ));
    }
    Ok(())
}

/// Validate a sort order value: must be non-negative.
pub fn validate_sort_order(sort_order: i32) -> Result<(), String> {
    if sort_order < 0 {
        return Err("Sort order must be zero or greater".to_string());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_round_trip() {
        for s in CollectionType::ALL {
            assert_eq!(CollectionType::from_str(s).unwrap().as_str(), *s);
        }
    }

    #[test]
    fn type_unknown_returns_none() {
        assert!(CollectionType::from_str("smart").is_none());
    }

    #[test]
    fn type_display_matches_as_str() {
        assert_eq!(format!("{}", CollectionType::Automated), "automated");
    }

    #[test]
    fn valid_name_accepted() {
        assert!(validate_name("Summer Collection").is_ok());
    }

    #[test]
    fn empty_name_rejected() {
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
    }

    #[test]
    fn overlong_name_rejected() {
        assert!(validate_name(&"x".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn negative_sort_order_rejected() {
        assert!(validate_sort_order(-1).is_err());
        assert!(validate_sort_order(0).is_ok());
    }
}
