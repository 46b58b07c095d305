//! Position/VWAP engine - running cost basis per instrument.

mod vwap_calculator;
mod vwap_model;

pub use vwap_calculator::*;
pub use vwap_model::*;
