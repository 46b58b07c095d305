//! Portfolio module - VWAP engine and holdings aggregation.

pub mod holdings;
pub mod vwap;

pub use holdings::{HoldingsCalculationResult, HoldingsCalculator, HoldingsIssue, HoldingsRow};
pub use vwap::{CalculatorConfig, FlatSellPolicy, PositionState, VwapCalculator, VwapSnapshot};
