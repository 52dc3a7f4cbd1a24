//! Collection bulk transfer contract: the three CSV exchange formats.
//!
//! - Format A upserts collection metadata, keyed by exact `name`.
//!   All-or-nothing: any violation aborts the batch.
//! - Format B associates products with collections (manual mode).
//!   Per-row: bad rows are reported individually, good rows still apply.
//! - Format C is the export schema.
//!
//! This module validates shape and types only; id resolution and
//! persistence belong to the callers. See [`crate::csv`] for the
//! file-level gates (size ceiling, media type) and raw parsing.

use serde::{Deserialize, Serialize};

use crate::csv::CsvTable;
use crate::error::{BulkError, RowError, ValidationError, ValidationErrorKind};
use crate::types::{DbId, ProductId, Timestamp};

// ---------------------------------------------------------------------------
// Format A: collection metadata upsert
// ---------------------------------------------------------------------------

/// Columns that must be present in a Format A header.
pub const FORMAT_A_REQUIRED: &[&str] = &["name", "description", "isVisible"];

/// One validated Format A row. Upsert key is `name`, exact
/// case-sensitive match; a matching collection is fully replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionUpsertRow {
    pub name: String,
    pub description: String,
    pub is_visible: bool,
    pub seo_title: String,
    pub seo_description: String,
    pub sort_order: i32,
}

/// Parse a boolean literal, case-insensitive.
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Verify that all `required` columns exist in the header.
fn check_required_columns(table: &CsvTable, required: &[&str]) -> Result<(), ValidationError> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|name| table.column(name).is_none())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(
            ValidationErrorKind::MissingRequiredColumn,
            format!("Missing required column(s): {}", missing.join(", ")),
        ))
    }
}

/// Validate a parsed Format A table into upsert rows.
///
/// A missing required header column aborts with a file-level
/// `missing-required-column`. Row-level violations (blank `name`, bad
/// `isVisible` literal, bad `sortOrder`) are collected and the whole
/// batch is rejected with them; no partial upsert list is returned.
pub fn validate_collection_upsert(table: &CsvTable) -> Result<Vec<CollectionUpsertRow>, BulkError> {
    check_required_columns(table, FORMAT_A_REQUIRED)?;

    let name_col = table.column("name");
    let description_col = table.column("description");
    let visible_col = table.column("isVisible");
    let seo_title_col = table.column("seoTitle");
    let seo_description_col = table.column("seoDescription");
    let sort_order_col = table.column("sortOrder");

    let mut records = Vec::with_capacity(table.rows.len());
    let mut errors = Vec::new();

    for (index, row) in table.rows.iter().enumerate() {
        let name = table.cell(row, name_col).trim();
        if name.is_empty() {
            errors.push(RowError::new(
                index,
                "missing-required-column: 'name' must not be blank",
            ));
            continue;
        }

        let visible_raw = table.cell(row, visible_col);
        let Some(is_visible) = parse_bool(visible_raw) else {
            errors.push(RowError::new(
                index,
                format!("'isVisible' must be 'true' or 'false', got '{visible_raw}'"),
            ));
            continue;
        };

        let sort_raw = table.cell(row, sort_order_col).trim();
        let sort_order = if sort_raw.is_empty() {
            0
        } else {
            match sort_raw.parse::<i32>() {
                Ok(n) if n >= 0 => n,
                _ => {
                    errors.push(RowError::new(
                        index,
                        format!("malformed-number: 'sortOrder' must be an integer >= 0, got '{sort_raw}'"),
                    ));
                    continue;
                }
            }
        };

        records.push(CollectionUpsertRow {
            name: name.to_string(),
            description: table.cell(row, description_col).to_string(),
            is_visible,
            seo_title: table.cell(row, seo_title_col).to_string(),
            seo_description: table.cell(row, seo_description_col).to_string(),
            sort_order,
        });
    }

    if errors.is_empty() {
        Ok(records)
    } else {
        Err(BulkError::Rows(errors))
    }
}

// ---------------------------------------------------------------------------
// Format B: product membership import
// ---------------------------------------------------------------------------

/// Columns that must be present in a Format B header.
pub const FORMAT_B_REQUIRED: &[&str] = &["collection_id", "product_id"];

/// One validated membership association. `position` defaults to the
/// row's append order within its collection_id group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRecord {
    /// Zero-based data row index this record came from, for error
    /// attribution after id resolution.
    pub row: usize,
    pub collection_id: DbId,
    pub product_id: ProductId,
    pub position: i32,
}

/// Outcome of Format B shape validation: accepted records plus per-row
/// errors. Bad rows never abort the batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MembershipValidation {
    pub records: Vec<MembershipRecord>,
    pub errors: Vec<RowError>,
}

/// Validate a parsed Format B table.
///
/// Shape checks only; whether the ids resolve to existing entities is
/// the caller's concern. A row with an unparsable `collection_id`,
/// blank `product_id`, or negative/garbage `position` is rejected
/// individually. Rows without an explicit position get the append order
/// within their collection group, stable on input order.
pub fn validate_membership_import(table: &CsvTable) -> Result<MembershipValidation, ValidationError> {
    check_required_columns(table, FORMAT_B_REQUIRED)?;

    let collection_col = table.column("collection_id");
    let product_col = table.column("product_id");
    let position_col = table.column("position");

    let mut out = MembershipValidation::default();
    // Rows seen per collection id, for default position assignment.
    let mut group_counts: std::collections::HashMap<DbId, i32> = std::collections::HashMap::new();

    for (index, row) in table.rows.iter().enumerate() {
        let collection_raw = table.cell(row, collection_col).trim();
        let Ok(collection_id) = collection_raw.parse::<DbId>() else {
            out.errors.push(RowError::new(
                index,
                format!("'collection_id' is not a valid id: '{collection_raw}'"),
            ));
            continue;
        };

        let product_id = table.cell(row, product_col).trim();
        if product_id.is_empty() {
            out.errors.push(RowError::new(
                index,
                "missing-required-column: 'product_id' must not be blank",
            ));
            continue;
        }

        let append_order = group_counts.entry(collection_id).or_insert(0);
        let position_raw = table.cell(row, position_col).trim();
        let position = if position_raw.is_empty() {
            *append_order
        } else {
            match position_raw.parse::<i32>() {
                Ok(n) if n >= 0 => n,
                _ => {
                    out.errors.push(RowError::new(
                        index,
                        format!(
                            "malformed-number: 'position' must be an integer >= 0, got '{position_raw}'"
                        ),
                    ));
                    continue;
                }
            }
        };
        *append_order += 1;

        out.records.push(MembershipRecord {
            row: index,
            collection_id,
            product_id: product_id.to_string(),
            position,
        });
    }

    Ok(out)
}

// ---------------------------------------------------------------------------
// Format C: export
// ---------------------------------------------------------------------------

/// Export header, in column order.
pub const FORMAT_C_HEADER: &[&str] = &[
    "name",
    "description",
    "isVisible",
    "sortOrder",
    "seoTitle",
    "createdAt",
];

/// One collection as it appears in an export file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionExportRow {
    pub name: String,
    pub description: String,
    pub is_visible: bool,
    pub sort_order: i32,
    pub seo_title: String,
    pub created_at: Timestamp,
}

/// Serialize collections into Format C CSV text.
///
/// One row per collection in the given (canonical listing) order.
/// Timestamps are ISO-8601 UTC. Output re-parses with [`crate::csv`].
pub fn serialize_export(collections: &[CollectionExportRow]) -> String {
    let mut lines = Vec::with_capacity(collections.len() + 1);
    lines.push(FORMAT_C_HEADER.join(","));

    for c in collections {
        let cells = vec![
            c.name.clone(),
            c.description.clone(),
            c.is_visible.to_string(),
            c.sort_order.to_string(),
            c.seo_title.clone(),
            c.created_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        ];
        lines.push(crate::csv::join_row(&cells));
    }

    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    fn table(text: &str) -> CsvTable {
        csv::parse(text.as_bytes()).unwrap()
    }

    // -- Format A -------------------------------------------------------------

    #[test]
    fn format_a_valid_rows_accepted() {
        let t = table(
            "name,description,isVisible,seoTitle,sortOrder\n\
             Summer,Warm stuff,true,Summer SEO,3\n\
             Winter,,false,,",
        );
        let rows = validate_collection_upsert(&t).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Summer");
        assert_eq!(rows[0].sort_order, 3);
        assert!(rows[0].is_visible);
        assert_eq!(rows[1].description, "");
        assert_eq!(rows[1].sort_order, 0);
        assert!(!rows[1].is_visible);
    }

    #[test]
    fn format_a_missing_header_column_aborts() {
        let t = table("name,isVisible\nSummer,true");
        let err = validate_collection_upsert(&t).unwrap_err();
        assert_matches!(err, BulkError::Validation(v) => {
            assert_eq!(v.kind, ValidationErrorKind::MissingRequiredColumn);
            assert!(v.message.contains("description"));
        });
    }

    #[test]
    fn format_a_blank_name_rejects_batch() {
        let t = table("name,description,isVisible\n,desc,true\nOk,desc,true");
        let err = validate_collection_upsert(&t).unwrap_err();
        assert_matches!(err, BulkError::Rows(rows) => {
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].row, 0);
            assert!(rows[0].reason.contains("missing-required-column"));
        });
    }

    #[test]
    fn format_a_uppercase_true_parses() {
        let t = table("name,description,isVisible\nSummer,,TRUE");
        let rows = validate_collection_upsert(&t).unwrap();
        assert!(rows[0].is_visible);
    }

    #[test]
    fn format_a_bad_boolean_rejected() {
        let t = table("name,description,isVisible\nSummer,,yes");
        let err = validate_collection_upsert(&t).unwrap_err();
        assert_matches!(err, BulkError::Rows(rows) => {
            assert!(rows[0].reason.contains("isVisible"));
        });
    }

    #[test]
    fn format_a_negative_sort_order_rejected() {
        let t = table("name,description,isVisible,sortOrder\nSummer,,true,-2");
        let err = validate_collection_upsert(&t).unwrap_err();
        assert_matches!(err, BulkError::Rows(rows) => {
            assert!(rows[0].reason.contains("malformed-number"));
        });
    }

    #[test]
    fn format_a_quoted_name_preserved() {
        let t = table("name,description,isVisible\n\"O'Brien, Inc.\",x,true");
        let rows = validate_collection_upsert(&t).unwrap();
        assert_eq!(rows[0].name, "O'Brien, Inc.");
    }

    // -- Format B -------------------------------------------------------------

    #[test]
    fn format_b_defaults_position_per_group() {
        let t = table(
            "collection_id,product_id\n\
             1,p-a\n\
             2,p-b\n\
             1,p-c",
        );
        let out = validate_membership_import(&t).unwrap();
        assert!(out.errors.is_empty());
        assert_eq!(out.records.len(), 3);
        assert_eq!(out.records[0].position, 0); // collection 1, first
        assert_eq!(out.records[1].position, 0); // collection 2, first
        assert_eq!(out.records[2].position, 1); // collection 1, second
    }

    #[test]
    fn format_b_explicit_position_kept() {
        let t = table("collection_id,product_id,position\n7,p-x,42");
        let out = validate_membership_import(&t).unwrap();
        assert_eq!(out.records[0].position, 42);
    }

    #[test]
    fn format_b_bad_rows_do_not_abort() {
        let t = table(
            "collection_id,product_id\n\
             not-an-id,p-a\n\
             3,\n\
             3,p-ok",
        );
        let out = validate_membership_import(&t).unwrap();
        assert_eq!(out.errors.len(), 2);
        assert_eq!(out.errors[0].row, 0);
        assert_eq!(out.errors[1].row, 1);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].product_id, "p-ok");
        assert_eq!(out.records[0].row, 2);
    }

    #[test]
    fn format_b_negative_position_rejected_per_row() {
        let t = table("collection_id,product_id,position\n1,p-a,-1\n1,p-b,");
        let out = validate_membership_import(&t).unwrap();
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].product_id, "p-b");
    }

    #[test]
    fn format_b_missing_header_aborts() {
        let t = table("collection_id\n1");
        let err = validate_membership_import(&t).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::MissingRequiredColumn);
    }

    // -- Format C -------------------------------------------------------------

    fn export_row(name: &str) -> CollectionExportRow {
        CollectionExportRow {
            name: name.to_string(),
            description: "desc".to_string(),
            is_visible: true,
            sort_order: 0,
            seo_title: String::new(),
            created_at: chrono::Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn export_header_and_order() {
        let out = serialize_export(&[export_row("A"), export_row("B")]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "name,description,isVisible,sortOrder,seoTitle,createdAt");
        assert!(lines[1].starts_with("A,"));
        assert!(lines[2].starts_with("B,"));
    }

    #[test]
    fn export_quotes_comma_names() {
        let out = serialize_export(&[export_row("O'Brien, Inc.")]);
        assert!(out.contains("\"O'Brien, Inc.\""));
    }

    #[test]
    fn export_timestamp_is_iso8601() {
        let out = serialize_export(&[export_row("A")]);
        assert!(out.contains("2024-06-01T12:00:00Z"));
    }

    #[test]
    fn export_reimports_cleanly() {
        let out = serialize_export(&[export_row("O'Brien, Inc.")]);
        let t = csv::parse(out.as_bytes()).unwrap();
        assert_eq!(t.rows[0][0], "O'Brien, Inc.");
        assert_eq!(t.rows[0][2], "true");
    }

    #[test]
    fn export_multiline_description_reimports_as_one_row() {
        let mut exported = export_row("A");
        exported.description = "line one\nline two".to_string();
        let out = serialize_export(&[exported]);
        let t = csv::parse(out.as_bytes()).unwrap();
        assert_eq!(t.rows.len(), 1);
        assert_eq!(t.rows[0][1], "line one\nline two");
    }

    #[test]
    fn export_empty_is_header_only() {
        let out = serialize_export(&[]);
        assert_eq!(out.lines().count(), 1);
    }
}
