use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::CalculatorError;
use crate::portfolio::vwap::VwapSnapshot;

/// One open position after all transactions have been applied.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HoldingsRow {
    pub instrument_id: String,
    pub isin: Option<String>,
    pub currency: String,
    /// Never zero; negative for an open short.
    pub net_quantity: Decimal,
    /// Sum over every transaction of the instrument, including ones from
    /// earlier, already closed, holding periods.
    pub total_transaction_cost: Decimal,
    /// Cost basis per unit from the instrument's last VWAP snapshot.
    pub average_cost: Option<Decimal>,
}

impl HoldingsRow {
    /// `average_cost * net_quantity`, undefined without a cost basis.
    pub fn cost_basis(&self) -> Option<Decimal> {
        self.average_cost?.checked_mul(self.net_quantity)
    }
}

/// An instrument whose transactions could not be aggregated.
/// Other instruments are unaffected.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldingsIssue {
    pub instrument_id: String,
    pub error: CalculatorError,
}

impl std::fmt::Display for HoldingsIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Instrument {}: {}", self.instrument_id, self.error)
    }
}

/// Result of a holdings pass: the open positions, the point-in-time VWAP
/// series they were derived from, and any instruments that had to be left out.
#[derive(Debug, Clone)]
pub struct HoldingsCalculationResult {
    /// Sorted by instrument id, then currency.
    pub rows: Vec<HoldingsRow>,
    /// One per input transaction, in input order.
    pub snapshots: Vec<VwapSnapshot>,
    pub issues: Vec<HoldingsIssue>,
}

impl HoldingsCalculationResult {
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }
}
