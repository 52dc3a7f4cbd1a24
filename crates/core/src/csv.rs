//! Low-level CSV plumbing shared by the bulk transfer formats.
//!
//! Comma-delimited, UTF-8, mandatory header row, standard quoting
//! (fields containing a comma, quote, or newline are wrapped in double
//! quotes; embedded quotes double up, quoted fields may span lines).
//! Parsing and serialization are symmetric so exported files re-import
//! cleanly.

use crate::error::{ValidationError, ValidationErrorKind};

/// Upload size ceiling, checked before any parsing attempt.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Media types accepted for CSV uploads. Browsers disagree on what a
/// `.csv` file is; Excel-era types show up in the wild.
pub const CSV_MEDIA_TYPES: &[&str] = &["text/csv", "application/csv", "application/vnd.ms-excel"];

// ---------------------------------------------------------------------------
// Upload gates
// ---------------------------------------------------------------------------

/// Reject an upload before parsing when it is oversized or not declared
/// as CSV. The media type comparison ignores case and parameters
/// (`text/csv; charset=utf-8` passes).
pub fn check_upload(size_bytes: usize, media_type: &str) -> Result<(), ValidationError> {
    if size_bytes > MAX_UPLOAD_BYTES {
        return Err(ValidationError::new(
            ValidationErrorKind::FileTooLarge,
            format!("File is {size_bytes} bytes; the limit is {MAX_UPLOAD_BYTES} bytes (10 MB)"),
        ));
    }

    let essence = media_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    if !CSV_MEDIA_TYPES.contains(&essence.as_str()) {
        return Err(ValidationError::new(
            ValidationErrorKind::WrongMediaType,
            format!("Media type '{media_type}' is not CSV-compatible"),
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// A parsed CSV file: a header row plus data rows of raw string cells.
#[derive(Debug, Clone)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Index of a header column, exact match.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell value by row slice and column index; absent trailing cells
    /// read as empty.
    pub fn cell<'a>(&self, row: &'a [String], column: Option<usize>) -> &'a str {
        column
            .and_then(|i| row.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Parse raw CSV bytes into a [`CsvTable`].
///
/// The first record is the header. Blank lines between records are
/// skipped. Quoted cells may contain commas, doubled quotes, and line
/// breaks, so a multi-line cell stays one record. Non-UTF-8 input and a
/// missing or empty header row are rejected.
pub fn parse(data: &[u8]) -> Result<CsvTable, ValidationError> {
    let text = std::str::from_utf8(data).map_err(|e| {
        ValidationError::new(
            ValidationErrorKind::WrongMediaType,
            format!("File is not valid UTF-8: {e}"),
        )
    })?;

    let mut records = split_records(text)
        .into_iter()
        .filter(|cells| !(cells.len() == 1 && cells[0].trim().is_empty()));

    let headers = records.next().ok_or_else(|| {
        ValidationError::new(
            ValidationErrorKind::MissingRequiredColumn,
            "CSV file is empty; a header row is required",
        )
    })?;
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ValidationError::new(
            ValidationErrorKind::MissingRequiredColumn,
            "CSV header row is empty",
        ));
    }

    Ok(CsvTable {
        headers,
        rows: records.collect(),
    })
}

/// Split CSV text into records of cells, honoring quoting. A newline
/// outside quotes terminates the record; inside quotes it is cell
/// content. CRLF record terminators are accepted.
fn split_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(ch);
            }
        } else {
            match ch {
                '"' => in_quotes = true,
                ',' => cells.push(std::mem::take(&mut current)),
                '\r' if chars.peek() == Some(&'\n') => {}
                '\n' => {
                    cells.push(std::mem::take(&mut current));
                    records.push(std::mem::take(&mut cells));
                }
                _ => current.push(ch),
            }
        }
    }

    cells.push(current);
    records.push(cells);
    records
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

/// Quote a value when it contains a comma, quote, or newline.
pub fn escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Join pre-escaped or raw cells into one CSV line.
pub fn join_row(cells: &[String]) -> String {
    cells
        .iter()
        .map(|c| escape(c))
        .collect::<Vec<_>>()
        .join(",")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationErrorKind;

    // -- upload gates ---------------------------------------------------------

    #[test]
    fn upload_within_limits_accepted() {
        assert!(check_upload(1024, "text/csv").is_ok());
    }

    #[test]
    fn oversized_upload_rejected() {
        let err = check_upload(MAX_UPLOAD_BYTES + 1, "text/csv").unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::FileTooLarge);
    }

    #[test]
    fn upload_at_exact_limit_accepted() {
        assert!(check_upload(MAX_UPLOAD_BYTES, "text/csv").is_ok());
    }

    #[test]
    fn wrong_media_type_rejected() {
        let err = check_upload(10, "application/json").unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::WrongMediaType);
    }

    #[test]
    fn media_type_parameters_and_case_ignored() {
        assert!(check_upload(10, "Text/CSV; charset=utf-8").is_ok());
        assert!(check_upload(10, "application/vnd.ms-excel").is_ok());
    }

    // -- parsing --------------------------------------------------------------

    #[test]
    fn parse_simple_table() {
        let table = parse(b"a,b,c\n1,2,3\n4,5,6").unwrap();
        assert_eq!(table.headers, vec!["a", "b", "c"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1], vec!["4", "5", "6"]);
    }

    #[test]
    fn parse_skips_blank_lines() {
        let table = parse(b"a,b\n1,2\n\n3,4\n").unwrap();
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn parse_quoted_cells() {
        let table = parse(b"name\n\"O'Brien, Inc.\"\n\"He said \"\"hi\"\"\"").unwrap();
        assert_eq!(table.rows[0][0], "O'Brien, Inc.");
        assert_eq!(table.rows[1][0], "He said \"hi\"");
    }

    #[test]
    fn parse_quoted_newline_stays_one_row() {
        let table = parse(b"name,description\nA,\"line one\nline two\"").unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][1], "line one\nline two");
    }

    #[test]
    fn parse_crlf_line_endings() {
        let table = parse(b"a,b\r\n1,2\r\n").unwrap();
        assert_eq!(table.headers, vec!["a", "b"]);
        assert_eq!(table.rows[0], vec!["1", "2"]);
    }

    #[test]
    fn parse_empty_file_rejected() {
        let err = parse(b"").unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::MissingRequiredColumn);
    }

    #[test]
    fn parse_non_utf8_rejected() {
        let err = parse(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::WrongMediaType);
    }

    #[test]
    fn column_lookup_is_exact() {
        let table = parse(b"Name,name\nx,y").unwrap();
        assert_eq!(table.column("name"), Some(1));
        assert_eq!(table.column("NAME"), None);
    }

    #[test]
    fn cell_reads_empty_for_short_rows() {
        let table = parse(b"a,b,c\n1").unwrap();
        let row = &table.rows[0];
        assert_eq!(table.cell(row, table.column("c")), "");
        assert_eq!(table.cell(row, None), "");
    }

    // -- serialization --------------------------------------------------------

    #[test]
    fn escape_quotes_comma_values() {
        assert_eq!(escape("O'Brien, Inc."), "\"O'Brien, Inc.\"");
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn join_then_parse_round_trips() {
        let cells = vec!["a,b".to_string(), "plain".to_string(), "q\"q".to_string()];
        let line = format!("h1,h2,h3\n{}", join_row(&cells));
        let table = parse(line.as_bytes()).unwrap();
        assert_eq!(table.rows[0], cells);
    }

    #[test]
    fn multiline_cell_round_trips() {
        let cells = vec!["first\nsecond".to_string(), "plain".to_string()];
        let text = format!("h1,h2\n{}", join_row(&cells));
        let table = parse(text.as_bytes()).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0], cells);
    }
}
