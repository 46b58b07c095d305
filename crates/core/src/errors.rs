//! Core error types for the cost basis tracker.
//!
//! Errors raised here are either fatal for a single call (malformed CSV,
//! unreadable input) or collected per instrument by the calculators so that
//! one bad instrument never blocks the rest of a pass.

use chrono::ParseError as ChronoParseError;
use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Holdings calculation failed: {0}")]
    Calculation(#[from] CalculatorError),
}

/// Errors that occur during cost basis and holdings calculations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalculatorError {
    #[error("Currency mismatch for instrument {instrument_id}: traded in {} and {}. Instruments must trade in a single currency.",
        first_currency, second_currency
    )]
    CurrencyMismatch {
        instrument_id: String,
        first_currency: String,
        second_currency: String,
    },

    #[error("Calculation failed: {0}")]
    Calculation(String),
}

/// Validation errors for user input and data parsing.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("Failed to parse date/time: {0}")]
    DateTimeParse(#[from] ChronoParseError),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}
