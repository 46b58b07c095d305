//! Transactions module - domain model and export import.

mod csv_parser;
mod import;
mod transactions_model;



pub use csv_parser::{parse_csv, ParseConfig, ParsedCsv};
pub use import::{
    import_transactions, parse_decimal_cell, parse_timestamp, ColumnMapping, ImportResult,
    ImportWarning,
};
pub use transactions_model::Transaction;
