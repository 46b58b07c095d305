//! CSV parsing for broker transaction exports.
//!
//! Handles the byte-level concerns (BOM, delimiter detection, ragged rows)
//! and leaves field interpretation to the import step.

use csv::{ReaderBuilder, Terminator};
use serde::{Deserialize, Serialize};

use crate::errors::{Error, ValidationError};
use crate::Result;

/// Configuration for reading a transaction export.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ParseConfig {
    /// Delimiter character: ",", ";", "\t", or "auto" (default: "auto")
    pub delimiter: Option<String>,
    /// Quote character (default: "\"")
    pub quote_char: Option<String>,
    /// Whether to skip empty rows (default: true)
    pub skip_empty_rows: Option<bool>,
    /// chrono format of the date column (default: "%d-%m-%Y")
    pub date_format: Option<String>,
    /// chrono format of the time column (default: "%H:%M")
    pub time_format: Option<String>,
    /// Decimal separator: "auto", ".", or "," (default: "auto")
    pub decimal_separator: Option<String>,
    /// Currency to use when a row leaves it blank
    pub default_currency: Option<String>,
}

impl ParseConfig {
    /// Returns the effective delimiter, defaulting to "auto"
    pub fn effective_delimiter(&self) -> &str {
        self.delimiter.as_deref().unwrap_or("auto")
    }

    /// Returns whether to skip empty rows
    pub fn skip_empty(&self) -> bool {
        self.skip_empty_rows.unwrap_or(true)
    }

    /// Returns the quote character as a byte
    pub fn quote_byte(&self) -> Result<u8> {
        match self.quote_char.as_deref() {
            None | Some("") => Ok(b'"'),
            Some(quote) => single_ascii_byte(quote, "Quote character"),
        }
    }

    pub fn effective_date_format(&self) -> &str {
        self.date_format.as_deref().unwrap_or("%d-%m-%Y")
    }

    pub fn effective_time_format(&self) -> &str {
        self.time_format.as_deref().unwrap_or("%H:%M")
    }

    pub fn effective_decimal_separator(&self) -> &str {
        self.decimal_separator.as_deref().unwrap_or("auto")
    }
}

/// Headers and raw rows of a parsed export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedCsv {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Delimiter actually used (after auto-detection)
    pub delimiter: String,
    /// Row-level problems that did not stop parsing
    pub errors: Vec<String>,
}

/// Parses CSV content with the given configuration.
///
/// The first non-empty record is taken as the header row. Rows shorter than
/// the header are padded with empty cells; longer rows are truncated and
/// reported in `errors`.
pub fn parse_csv(content: &[u8], config: &ParseConfig) -> Result<ParsedCsv> {
    let mut errors = Vec::new();
    let content_str = decode_content(content, &mut errors);
    let delimiter = detect_delimiter(&content_str, config);
    let delimiter_byte = single_ascii_byte(delimiter, "Delimiter")?;
    let quote_byte = config.quote_byte()?;

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter_byte)
        .quote(quote_byte)
        .has_headers(false)
        .flexible(true)
        .terminator(Terminator::Any(b'\n'))
        .from_reader(content_str.as_bytes());

    let mut records: Vec<Vec<String>> = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        match result {
            Ok(record) => {
                let row: Vec<String> = record
                    .iter()
                    .map(|s| s.trim_end_matches('\r').to_string())
                    .collect();
                if config.skip_empty() && row.iter().all(|cell| cell.trim().is_empty()) {
                    continue;
                }
                records.push(row);
            }
            Err(e) => errors.push(format!("Failed to parse row {}: {}", idx + 1, e)),
        }
    }

    if records.is_empty() {
        return Err(Error::Validation(ValidationError::InvalidInput(
            "CSV file is empty or contains no valid records".to_string(),
        )));
    }

    let headers: Vec<String> = records
        .remove(0)
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let header_count = headers.len();

    let rows = records
        .into_iter()
        .enumerate()
        .map(|(idx, mut row)| {
            if row.len() < header_count {
                row.resize(header_count, String::new());
            } else if row.len() > header_count {
                errors.push(format!(
                    "Row {} has {} columns, expected {}. Extra columns ignored.",
                    idx + 1,
                    row.len(),
                    header_count
                ));
                row.truncate(header_count);
            }
            row
        })
        .collect();

    Ok(ParsedCsv {
        headers,
        rows,
        delimiter: delimiter.to_string(),
        errors,
    })
}

/// The csv reader works on single bytes; anything wider would be truncated.
fn single_ascii_byte(value: &str, what: &str) -> Result<u8> {
    match value.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ => Err(Error::Validation(ValidationError::InvalidInput(format!(
            "{} must be a single ASCII character, got '{}'",
            what, value
        )))),
    }
}

/// Decodes content bytes to a UTF-8 string, dropping a BOM if present.
fn decode_content(content: &[u8], errors: &mut Vec<String>) -> String {
    let content = content.strip_prefix(&[0xEF_u8, 0xBB, 0xBF][..]).unwrap_or(content);
    match std::str::from_utf8(content) {
        Ok(s) => s.to_string(),
        Err(e) => {
            errors.push(format!(
                "Invalid UTF-8 encoding at byte {}: {}. Some characters may be replaced.",
                e.valid_up_to(),
                e
            ));
            String::from_utf8_lossy(content).into_owned()
        }
    }
}

fn detect_delimiter<'a>(content: &str, config: &'a ParseConfig) -> &'a str {
    match config.effective_delimiter() {
        "auto" => {}
        "\\t" | "\t" => return "\t",
        "" => return ",",
        other => return other,
    }

    let mut best_delimiter = ",";
    let mut best_score = 0usize;
    for delim in [",", ";", "\t"] {
        let score = score_delimiter(content, delim);
        if score > best_score {
            best_score = score;
            best_delimiter = delim;
        }
    }
    best_delimiter
}

/// Scores a delimiter by how consistently it splits the first lines.
fn score_delimiter(content: &str, delimiter: &str) -> usize {
    let delimiter_char = delimiter.chars().next().unwrap_or(',');
    let counts: Vec<usize> = content
        .lines()
        .take(10)
        .map(|line| line.matches(delimiter_char).count())
        .collect();

    let Some(&first_count) = counts.first() else {
        return 0;
    };
    let consistent_count = counts.iter().filter(|&&c| c == first_count).count();
    first_count * consistent_count
}
