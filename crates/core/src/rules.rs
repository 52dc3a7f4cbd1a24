//! Collection rule model and its flat-row translation.
//!
//! Automated collections persist a normalized [`RuleSet`] (a conjunction
//! of constraints). The editor works on an ordered list of
//! [`FlatRuleRow`] condition statements instead. [`expand`] and
//! [`collapse`] convert between the two.
//!
//! The mapping is deliberately asymmetric: the flat form can express
//! comparators (`is_not_equal_to`, reversed price bounds) that the
//! normalized form cannot. `collapse(expand(r))` always reproduces `r`;
//! the other direction is lossy.

use serde::{Deserialize, Serialize};

use crate::error::{AnomalyWarning, ValidationError, ValidationErrorKind};

// ---------------------------------------------------------------------------
// Fields and comparators
// ---------------------------------------------------------------------------

/// The attribute a rule row constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleField {
    ProductType,
    Vendor,
    Tags,
    PriceRange,
}

impl RuleField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProductType => "productType",
            Self::Vendor => "vendor",
            Self::Tags => "tags",
            Self::PriceRange => "priceRange",
        }
    }

    /// Parse a field string. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "productType" => Some(Self::ProductType),
            "vendor" => Some(Self::Vendor),
            "tags" => Some(Self::Tags),
            "priceRange" => Some(Self::PriceRange),
            _ => None,
        }
    }
}

impl std::fmt::Display for RuleField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The comparator of a rule row, as presented in the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleComparator {
    IsEqualTo,
    IsNotEqualTo,
    IsGreaterThan,
    IsLessThan,
}

impl RuleComparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IsEqualTo => "is_equal_to",
            Self::IsNotEqualTo => "is_not_equal_to",
            Self::IsGreaterThan => "is_greater_than",
            Self::IsLessThan => "is_less_than",
        }
    }

    /// Parse a comparator string. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "is_equal_to" => Some(Self::IsEqualTo),
            "is_not_equal_to" => Some(Self::IsNotEqualTo),
            "is_greater_than" => Some(Self::IsGreaterThan),
            "is_less_than" => Some(Self::IsLessThan),
            _ => None,
        }
    }
}

impl std::fmt::Display for RuleComparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Rule rows and rule sets
// ---------------------------------------------------------------------------

/// One editable condition statement. Editor-facing only, never persisted.
///
/// Serialized as `{field, condition, value}` to match the console's
/// submission shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRuleRow {
    pub field: RuleField,
    #[serde(rename = "condition")]
    pub comparator: RuleComparator,
    pub value: String,
}

impl FlatRuleRow {
    pub fn new(field: RuleField, comparator: RuleComparator, value: impl Into<String>) -> Self {
        Self {
            field,
            comparator,
            value: value.into(),
        }
    }
}

/// Price bounds. `min <= max` is enforced when both are present.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// Normalized automated-membership criteria, as persisted on the
/// collection row. All constraints are conjunctive.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<PriceRange>,
}

impl RuleSet {
    /// True when no constraint is present at all.
    pub fn is_empty(&self) -> bool {
        self.product_type.is_none()
            && self.vendor.is_none()
            && self.tags.is_empty()
            && self
                .price_range
                .map_or(true, |r| r.min.is_none() && r.max.is_none())
    }
}

// ---------------------------------------------------------------------------
// Expansion: RuleSet -> flat rows
// ---------------------------------------------------------------------------

/// Format a price bound without forced precision (`10.0` prints as `10`).
fn format_price(value: f64) -> String {
    format!("{value}")
}

/// Expand a normalized rule set into the editor's ordered row list.
///
/// Row order is fixed: productType, vendor, one row per tag in stored
/// order, price min, price max. Comparators are determined by the field;
/// only equality and the two range bounds are ever produced. Absent
/// fields produce no row, so an empty rule set expands to an empty list.
pub fn expand(rules: &RuleSet) -> Vec<FlatRuleRow> {
    let mut rows = Vec::new();

    if let Some(product_type) = rules.product_type.as_deref().filter(|s| !s.is_empty()) {
        rows.push(FlatRuleRow::new(
            RuleField::ProductType,
            RuleComparator::IsEqualTo,
            product_type,
        ));
    }

    if let Some(vendor) = rules.vendor.as_deref().filter(|s| !s.is_empty()) {
        rows.push(FlatRuleRow::new(
            RuleField::Vendor,
            RuleComparator::IsEqualTo,
            vendor,
        ));
    }

    for tag in &rules.tags {
        rows.push(FlatRuleRow::new(
            RuleField::Tags,
            RuleComparator::IsEqualTo,
            tag.clone(),
        ));
    }

    if let Some(range) = &rules.price_range {
        if let Some(min) = range.min {
            rows.push(FlatRuleRow::new(
                RuleField::PriceRange,
                RuleComparator::IsGreaterThan,
                format_price(min),
            ));
        }
        if let Some(max) = range.max {
            rows.push(FlatRuleRow::new(
                RuleField::PriceRange,
                RuleComparator::IsLessThan,
                format_price(max),
            ));
        }
    }

    rows
}

// ---------------------------------------------------------------------------
// Collapsing: flat rows -> RuleSet
// ---------------------------------------------------------------------------

/// Parse a price bound value: a non-negative finite decimal.
fn parse_price(row_index: usize, value: &str) -> Result<f64, ValidationError> {
    let parsed: f64 = value.trim().parse().map_err(|_| {
        ValidationError::new(
            ValidationErrorKind::MalformedNumber,
            format!("Row {row_index}: price value '{value}' is not a number"),
        )
    })?;
    if !parsed.is_finite() || parsed < 0.0 {
        return Err(ValidationError::new(
            ValidationErrorKind::MalformedNumber,
            format!("Row {row_index}: price value '{value}' must be a non-negative number"),
        ));
    }
    Ok(parsed)
}

fn unrepresentable(index: usize, row: &FlatRuleRow) -> AnomalyWarning {
    AnomalyWarning {
        row: index,
        field: row.field.as_str().to_string(),
        comparator: row.comparator.as_str().to_string(),
        message: format!(
            "Comparator '{}' on field '{}' has no normalized form; row dropped",
            row.comparator, row.field
        ),
    }
}

/// Collapse an arbitrary list of editor rows back into a normalized
/// rule set.
///
/// Policy:
/// - Singular fields (productType, vendor, price min, price max) take
///   the last contributing row in input order.
/// - All `tags` rows union cumulatively, deduplicated by exact string
///   match with insertion order preserved.
/// - Rows with a comparator the normalized form cannot express are
///   dropped, each recorded as an [`AnomalyWarning`].
/// - A price value that does not parse as a non-negative decimal aborts
///   the whole collapse with `malformed-number`; a parsed `min > max`
///   aborts with `inverted-range`. No partial rule set is returned.
pub fn collapse(rows: &[FlatRuleRow]) -> Result<(RuleSet, Vec<AnomalyWarning>), ValidationError> {
    let mut rules = RuleSet::default();
    let mut warnings = Vec::new();
    let mut price_min: Option<f64> = None;
    let mut price_max: Option<f64> = None;

    for (index, row) in rows.iter().enumerate() {
        match row.field {
            RuleField::ProductType | RuleField::Vendor => {
                if row.comparator != RuleComparator::IsEqualTo {
                    warnings.push(unrepresentable(index, row));
                    continue;
                }
                let value = row.value.trim();
                let slot = match row.field {
                    RuleField::ProductType => &mut rules.product_type,
                    _ => &mut rules.vendor,
                };
                // Last write wins; an empty value contributes nothing.
                if !value.is_empty() {
                    *slot = Some(value.to_string());
                }
            }
            RuleField::Tags => {
                if row.comparator != RuleComparator::IsEqualTo {
                    warnings.push(unrepresentable(index, row));
                    continue;
                }
                // Dedup is on the exact string; values are not normalized.
                let tag = row.value.as_str();
                if !tag.trim().is_empty() && !rules.tags.iter().any(|t| t == tag) {
                    rules.tags.push(tag.to_string());
                }
            }
            RuleField::PriceRange => match row.comparator {
                RuleComparator::IsGreaterThan => {
                    price_min = Some(parse_price(index, &row.value)?);
                }
                RuleComparator::IsLessThan => {
                    price_max = Some(parse_price(index, &row.value)?);
                }
                _ => warnings.push(unrepresentable(index, row)),
            },
        }
    }

    if let (Some(min), Some(max)) = (price_min, price_max) {
        if min > max {
            return Err(ValidationError::new(
                ValidationErrorKind::InvertedRange,
                format!("Price minimum {min} is greater than maximum {max}"),
            ));
        }
    }

    if price_min.is_some() || price_max.is_some() {
        rules.price_range = Some(PriceRange {
            min: price_min,
            max: price_max,
        });
    }

    Ok((rules, warnings))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn row(field: RuleField, comparator: RuleComparator, value: &str) -> FlatRuleRow {
        FlatRuleRow::new(field, comparator, value)
    }

    fn full_rule_set() -> RuleSet {
        RuleSet {
            product_type: Some("Battery".into()),
            vendor: Some("Acme".into()),
            tags: vec!["summer".into(), "sale".into()],
            price_range: Some(PriceRange {
                min: Some(10.0),
                max: Some(99.5),
            }),
        }
    }

    // -- expand ---------------------------------------------------------------

    #[test]
    fn expand_empty_rule_set_is_empty() {
        assert!(expand(&RuleSet::default()).is_empty());
    }

    #[test]
    fn expand_orders_rows_deterministically() {
        let rows = expand(&full_rule_set());
        let fields: Vec<&str> = rows.iter().map(|r| r.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["productType", "vendor", "tags", "tags", "priceRange", "priceRange"]
        );
        assert_eq!(rows[4].comparator, RuleComparator::IsGreaterThan);
        assert_eq!(rows[5].comparator, RuleComparator::IsLessThan);
    }

    #[test]
    fn expand_stringifies_prices_without_forced_precision() {
        let rules = RuleSet {
            price_range: Some(PriceRange {
                min: Some(10.0),
                max: Some(99.5),
            }),
            ..Default::default()
        };
        let rows = expand(&rules);
        assert_eq!(rows[0].value, "10");
        assert_eq!(rows[1].value, "99.5");
    }

    #[test]
    fn expand_only_min_produces_single_row() {
        let rules = RuleSet {
            price_range: Some(PriceRange {
                min: Some(5.0),
                max: None,
            }),
            ..Default::default()
        };
        let rows = expand(&rules);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].comparator, RuleComparator::IsGreaterThan);
    }

    #[test]
    fn expand_preserves_tag_order() {
        let rules = RuleSet {
            tags: vec!["b".into(), "a".into(), "c".into()],
            ..Default::default()
        };
        let rows = expand(&rules);
        let values: Vec<&str> = rows.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(values, vec!["b", "a", "c"]);
    }

    // -- collapse -------------------------------------------------------------

    #[test]
    fn collapse_round_trips_expand() {
        let original = full_rule_set();
        let (collapsed, warnings) = collapse(&expand(&original)).unwrap();
        assert_eq!(collapsed, original);
        assert!(warnings.is_empty());
    }

    #[test]
    fn collapse_empty_rows_yields_empty_rule_set() {
        let (rules, warnings) = collapse(&[]).unwrap();
        assert!(rules.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn collapse_dedups_tags_preserving_order() {
        let rows = vec![
            row(RuleField::Tags, RuleComparator::IsEqualTo, "a"),
            row(RuleField::Tags, RuleComparator::IsEqualTo, "b"),
            row(RuleField::Tags, RuleComparator::IsEqualTo, "a"),
        ];
        let (rules, _) = collapse(&rows).unwrap();
        assert_eq!(rules.tags, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn collapse_tag_dedup_is_exact_not_trimmed() {
        let rows = vec![
            row(RuleField::Tags, RuleComparator::IsEqualTo, "a"),
            row(RuleField::Tags, RuleComparator::IsEqualTo, " a "),
            row(RuleField::Tags, RuleComparator::IsEqualTo, "a"),
        ];
        let (rules, _) = collapse(&rows).unwrap();
        assert_eq!(rules.tags, vec!["a".to_string(), " a ".to_string()]);
    }

    #[test]
    fn collapse_last_write_wins_for_product_type() {
        let rows = vec![
            row(RuleField::ProductType, RuleComparator::IsEqualTo, "Battery"),
            row(RuleField::ProductType, RuleComparator::IsEqualTo, "Charger"),
        ];
        let (rules, _) = collapse(&rows).unwrap();
        assert_eq!(rules.product_type.as_deref(), Some("Charger"));
    }

    #[test]
    fn collapse_last_write_wins_per_price_bound() {
        let rows = vec![
            row(RuleField::PriceRange, RuleComparator::IsGreaterThan, "1"),
            row(RuleField::PriceRange, RuleComparator::IsGreaterThan, "2"),
            row(RuleField::PriceRange, RuleComparator::IsLessThan, "50"),
        ];
        let (rules, _) = collapse(&rows).unwrap();
        let range = rules.price_range.unwrap();
        assert_eq!(range.min, Some(2.0));
        assert_eq!(range.max, Some(50.0));
    }

    #[test]
    fn collapse_inverted_range_rejected() {
        let rows = vec![
            row(RuleField::PriceRange, RuleComparator::IsGreaterThan, "10"),
            row(RuleField::PriceRange, RuleComparator::IsLessThan, "5"),
        ];
        let err = collapse(&rows).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::InvertedRange);
    }

    #[test]
    fn collapse_malformed_price_aborts_entirely() {
        let rows = vec![
            row(RuleField::Tags, RuleComparator::IsEqualTo, "kept"),
            row(RuleField::PriceRange, RuleComparator::IsGreaterThan, "ten"),
        ];
        let err = collapse(&rows).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::MalformedNumber);
    }

    #[test]
    fn collapse_negative_price_rejected() {
        let rows = vec![row(
            RuleField::PriceRange,
            RuleComparator::IsGreaterThan,
            "-3",
        )];
        let err = collapse(&rows).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::MalformedNumber);
    }

    #[test]
    fn collapse_drops_not_equal_vendor_with_warning() {
        let rows = vec![
            row(RuleField::Vendor, RuleComparator::IsNotEqualTo, "Acme"),
            row(RuleField::Vendor, RuleComparator::IsEqualTo, "Globex"),
        ];
        let (rules, warnings) = collapse(&rows).unwrap();
        assert_eq!(rules.vendor.as_deref(), Some("Globex"));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].row, 0);
        assert_eq!(warnings[0].comparator, "is_not_equal_to");
    }

    #[test]
    fn collapse_drops_equality_price_row_with_warning() {
        let rows = vec![row(RuleField::PriceRange, RuleComparator::IsEqualTo, "10")];
        let (rules, warnings) = collapse(&rows).unwrap();
        assert!(rules.price_range.is_none());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn collapse_ignores_blank_singular_values() {
        let rows = vec![row(RuleField::ProductType, RuleComparator::IsEqualTo, "  ")];
        let (rules, warnings) = collapse(&rows).unwrap();
        assert!(rules.product_type.is_none());
        assert!(warnings.is_empty());
    }

    // -- serde wire format ----------------------------------------------------

    #[test]
    fn flat_row_serializes_with_condition_key() {
        let json = serde_json::to_value(row(
            RuleField::ProductType,
            RuleComparator::IsEqualTo,
            "Battery",
        ))
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "field": "productType",
                "condition": "is_equal_to",
                "value": "Battery",
            })
        );
    }

    #[test]
    fn rule_set_round_trips_through_json() {
        let original = full_rule_set();
        let json = serde_json::to_string(&original).unwrap();
        let back: RuleSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, original);
        assert!(json.contains("\"productType\""));
        assert!(json.contains("\"priceRange\""));
    }

    #[test]
    fn empty_rule_set_serializes_to_empty_object() {
        let json = serde_json::to_string(&RuleSet::default()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn field_and_comparator_round_trip() {
        for s in ["productType", "vendor", "tags", "priceRange"] {
            assert_eq!(RuleField::from_str(s).unwrap().as_str(), s);
        }
        for s in [
            "is_equal_to",
            "is_not_equal_to",
            "is_greater_than",
            "is_less_than",
        ] {
            assert_eq!(RuleComparator::from_str(s).unwrap().as_str(), s);
        }
        assert_matches!(RuleField::from_str("price"), None);
        assert_matches!(RuleComparator::from_str("equals"), None);
    }
}
