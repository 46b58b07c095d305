//! Conversion of parsed export rows into `Transaction`s.
//!
//! Header names are matched against a `ColumnMapping`. The default mapping
//! understands the Dutch DEGIRO transaction export as well as plain English
//! canonical headers. Rows that cannot be dated are dropped here, so the
//! calculators only ever see a totally ordered stream.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::csv_parser::{parse_csv, ParseConfig};
use super::transactions_model::Transaction;
use crate::errors::{Error, ValidationError};
use crate::Result;

/// Header aliases for each field the import understands.
///
/// Matching is case-insensitive and ignores surrounding whitespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub date: Vec<String>,
    pub time: Vec<String>,
    pub product: Vec<String>,
    pub isin: Vec<String>,
    pub quantity: Vec<String>,
    pub price: Vec<String>,
    pub currency: Vec<String>,
    pub fx_rate: Vec<String>,
    pub transaction_cost: Vec<String>,
    /// Take the currency from the unnamed column right after the price column
    /// when no currency header matches.
    pub currency_follows_price: bool,
}

fn aliases(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl Default for ColumnMapping {
    fn default() -> Self {
        ColumnMapping {
            date: aliases(&["Datum", "date"]),
            time: aliases(&["Tijd", "time"]),
            product: aliases(&["Product", "product"]),
            isin: aliases(&["ISIN", "isin"]),
            quantity: aliases(&["Aantal", "quantity"]),
            price: aliases(&["Koers", "price_local", "price"]),
            currency: aliases(&["Unnamed: 8", "currency"]),
            fx_rate: aliases(&["Wisselkoers", "fx_rate"]),
            transaction_cost: aliases(&["Transactiekosten en/of", "transaction_cost"]),
            currency_follows_price: true,
        }
    }
}

/// Column indices resolved against one export's header row.
#[derive(Debug, Clone, PartialEq)]
struct ResolvedColumns {
    date: usize,
    time: Option<usize>,
    product: usize,
    isin: Option<usize>,
    quantity: usize,
    price: usize,
    currency: Option<usize>,
    fx_rate: Option<usize>,
    transaction_cost: Option<usize>,
}

fn find_column(headers: &[String], names: &[String]) -> Option<usize> {
    names.iter().find_map(|name| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name.trim()))
    })
}

fn require_column(headers: &[String], names: &[String], field: &str) -> Result<usize> {
    find_column(headers, names)
        .ok_or_else(|| Error::Validation(ValidationError::MissingField(field.to_string())))
}

impl ColumnMapping {
    fn resolve(&self, headers: &[String]) -> Result<ResolvedColumns> {
        let price = require_column(headers, &self.price, "price")?;
        let currency = find_column(headers, &self.currency).or_else(|| {
            let next = price + 1;
            let unnamed = headers.get(next).is_some_and(|h| h.trim().is_empty());
            (self.currency_follows_price && unnamed).then_some(next)
        });

        Ok(ResolvedColumns {
            date: require_column(headers, &self.date, "date")?,
            time: find_column(headers, &self.time),
            product: require_column(headers, &self.product, "product")?,
            isin: find_column(headers, &self.isin),
            quantity: require_column(headers, &self.quantity, "quantity")?,
            price,
            currency,
            fx_rate: find_column(headers, &self.fx_rate),
            transaction_cost: find_column(headers, &self.transaction_cost),
        })
    }
}

/// A row that was skipped or only partially understood.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportWarning {
    /// 1-based data row number (header excluded); `None` for file-level issues
    pub row: Option<usize>,
    pub message: String,
}

impl std::fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.row {
            Some(row) => write!(f, "Row {}: {}", row, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Transactions recovered from an export, in file order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub transactions: Vec<Transaction>,
    pub warnings: Vec<ImportWarning>,
}

impl ImportResult {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Parses a transaction export into typed transactions.
///
/// Fails only when the file itself is unusable (no records, required column
/// missing). Individual bad rows become warnings.
pub fn import_transactions(
    content: &[u8],
    config: &ParseConfig,
    mapping: &ColumnMapping,
) -> Result<ImportResult> {
    let parsed = parse_csv(content, config)?;
    let columns = mapping.resolve(&parsed.headers)?;
    debug!(
        "Importing {} rows (delimiter {:?}) with columns {:?}",
        parsed.rows.len(),
        parsed.delimiter,
        columns
    );

    let mut warnings: Vec<ImportWarning> = parsed
        .errors
        .into_iter()
        .map(|message| ImportWarning { row: None, message })
        .collect();
    let mut transactions = Vec::with_capacity(parsed.rows.len());

    for (idx, row) in parsed.rows.iter().enumerate() {
        let row_number = idx + 1;
        match row_to_transaction(row, &columns, config, row_number, &mut warnings) {
            Ok(tx) => transactions.push(tx),
            Err(message) => {
                let warning = ImportWarning {
                    row: Some(row_number),
                    message,
                };
                warn!("Skipping transaction row. {}", warning);
                warnings.push(warning);
            }
        }
    }

    Ok(ImportResult {
        transactions,
        warnings,
    })
}

fn cell<'a>(row: &'a [String], idx: Option<usize>) -> &'a str {
    idx.and_then(|i| row.get(i)).map(|s| s.trim()).unwrap_or("")
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Converts one row. An `Err` means the row is dropped.
fn row_to_transaction(
    row: &[String],
    columns: &ResolvedColumns,
    config: &ParseConfig,
    row_number: usize,
    warnings: &mut Vec<ImportWarning>,
) -> std::result::Result<Transaction, String> {
    let product = cell(row, Some(columns.product));
    if product.is_empty() {
        return Err("Product is empty".to_string());
    }

    let date_str = cell(row, Some(columns.date));
    let time_str = columns.time.map(|idx| cell(row, Some(idx)));
    let timestamp = parse_timestamp(date_str, time_str, config).map_err(|err| {
        format!(
            "Unparseable date/time '{} {}' for {}: {}",
            date_str,
            time_str.unwrap_or(""),
            product,
            err
        )
    })?;

    let currency = non_empty(cell(row, columns.currency))
        .or_else(|| config.default_currency.clone())
        .ok_or_else(|| format!("No currency for {} and no default configured", product))?;

    let separator = config.effective_decimal_separator();
    let mut decimal_field = |idx: Option<usize>, field: &str| -> Option<Decimal> {
        let raw = cell(row, idx);
        if raw.is_empty() {
            return None;
        }
        match parse_decimal_cell(raw, separator) {
            Ok(value) => Some(value),
            Err(err) => {
                warnings.push(ImportWarning {
                    row: Some(row_number),
                    message: format!(
                        "Invalid {} '{}' for {} ({}); treated as missing",
                        field, raw, product, err
                    ),
                });
                None
            }
        }
    };

    let quantity = decimal_field(Some(columns.quantity), "quantity");
    let unit_price = decimal_field(Some(columns.price), "price");
    let fx_rate = decimal_field(columns.fx_rate, "fx rate");
    let transaction_cost = decimal_field(columns.transaction_cost, "transaction cost");

    Ok(Transaction {
        instrument_id: product.to_string(),
        isin: non_empty(cell(row, columns.isin)),
        timestamp,
        quantity,
        unit_price,
        currency,
        fx_rate,
        transaction_cost,
    })
}

/// Combines the date and (optional) time cells into one timestamp.
///
/// When the export has a time column, both parts must parse. Without one the
/// date is taken at midnight.
pub fn parse_timestamp(
    date: &str,
    time: Option<&str>,
    config: &ParseConfig,
) -> std::result::Result<NaiveDateTime, ValidationError> {
    let date = NaiveDate::parse_from_str(date.trim(), config.effective_date_format())?;
    let time = match time {
        Some(t) => NaiveTime::parse_from_str(t.trim(), config.effective_time_format())?,
        None => NaiveTime::MIN,
    };
    Ok(date.and_time(time))
}

/// Parses a numeric cell with either `.` or `,` as the decimal separator.
///
/// With `"auto"`, the right-most of `.`/`,` is taken as the decimal
/// separator and the other one as a thousands separator.
pub fn parse_decimal_cell(
    value: &str,
    decimal_separator: &str,
) -> std::result::Result<Decimal, ValidationError> {
    let trimmed: String = value.trim().chars().filter(|c| !c.is_whitespace()).collect();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidInput("empty number".to_string()));
    }

    let separator = match decimal_separator {
        "." => '.',
        "," => ',',
        _ => match (trimmed.rfind('.'), trimmed.rfind(',')) {
            (Some(dot), Some(comma)) if comma > dot => ',',
            (None, Some(_)) => ',',
            _ => '.',
        },
    };
    let thousands = if separator == ',' { '.' } else { ',' };
    let normalized: String = trimmed
        .chars()
        .filter(|c| *c != thousands)
        .map(|c| if c == separator { '.' } else { c })
        .collect();

    let value = Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))?;
    Ok(value)
}
