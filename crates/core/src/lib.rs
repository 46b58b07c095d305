//! Cost basis core - transaction import, running VWAP and holdings.
//!
//! This crate turns a broker transaction export into per-instrument cost
//! basis. It performs no I/O of its own: callers hand it the export bytes
//! (or already typed transactions) and render the results.

pub mod constants;
pub mod errors;
pub mod portfolio;
pub mod transactions;

pub use portfolio::*;
pub use transactions::Transaction;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
