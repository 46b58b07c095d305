use chrono::NaiveDateTime;
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::FLAT_QUANTITY_THRESHOLD;
use crate::errors::Result;
use crate::transactions::Transaction;

/// What happens to the cost basis when a sell arrives while the position is flat.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlatSellPolicy {
    /// Short sales are not cost-tracked: the average cost becomes undefined.
    #[default]
    ClearCostBasis,
    /// Keep whatever average cost the position had before it went flat.
    KeepCostBasis,
}

/// Tuning knobs shared by the VWAP engine and the holdings aggregator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CalculatorConfig {
    /// A position whose absolute net quantity is at or below this value is flat.
    pub flat_quantity_threshold: Decimal,
    pub flat_sell_policy: FlatSellPolicy,
    /// Reduce each instrument on its own rayon worker.
    pub parallel: bool,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        CalculatorConfig {
            flat_quantity_threshold: Decimal::from_str_radix(FLAT_QUANTITY_THRESHOLD, 10)
                .unwrap_or(Decimal::ZERO),
            flat_sell_policy: FlatSellPolicy::default(),
            parallel: false,
        }
    }
}

impl CalculatorConfig {
    /// Loads a configuration from JSON; omitted fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_flat(&self, quantity: Decimal) -> bool {
        quantity.is_zero() || quantity.abs() <= self.flat_quantity_threshold
    }
}

/// Running state of one instrument while the engine walks its transactions.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PositionState {
    pub net_quantity: Decimal,
    /// Volume-weighted average acquisition price. `None` while there is no
    /// cost basis (never bought, short, or poisoned by a missing price).
    pub average_cost: Option<Decimal>,
}

impl PositionState {
    /// Applies one transaction. Sells never change the average cost; a buy
    /// into a flat position restarts it from the buy's price.
    pub fn apply(&mut self, transaction: &Transaction, config: &CalculatorConfig) {
        let Some(quantity) = transaction.quantity else {
            debug!(
                "Transaction for {} at {} has no quantity. Position unchanged.",
                transaction.instrument_id, transaction.timestamp
            );
            return;
        };
        if quantity.is_zero() {
            return;
        }

        // Flatness only resets the average; a sub-threshold residue stays in
        // the quantity so it matches the plain sum of all trades.
        let flat = config.is_flat(self.net_quantity);
        let Some(next_quantity) = self.net_quantity.checked_add(quantity) else {
            warn!(
                "Net quantity overflow for {} at {}. Transaction ignored.",
                transaction.instrument_id, transaction.timestamp
            );
            return;
        };

        if quantity.is_sign_negative() {
            if flat && config.flat_sell_policy == FlatSellPolicy::ClearCostBasis {
                debug!(
                    "Sell of {} while flat for {}. Cost basis cleared.",
                    quantity, transaction.instrument_id
                );
                self.average_cost = None;
            }
        } else if flat {
            self.average_cost = transaction.unit_price;
        } else {
            self.average_cost = weighted_average(
                self.average_cost,
                self.net_quantity,
                transaction.unit_price,
                quantity,
                next_quantity,
            );
        }

        if transaction.unit_price.is_none() && quantity.is_sign_positive() {
            warn!(
                "Buy for {} at {} has no price. Average cost is undefined until the position closes.",
                transaction.instrument_id, transaction.timestamp
            );
        }

        self.net_quantity = next_quantity;
    }
}

/// `(avg * held + price * bought) / total`, undefined if any input is or if
/// the arithmetic overflows or divides by zero.
fn weighted_average(
    average_cost: Option<Decimal>,
    held: Decimal,
    unit_price: Option<Decimal>,
    bought: Decimal,
    total: Decimal,
) -> Option<Decimal> {
    let held_value = average_cost?.checked_mul(held)?;
    let bought_value = unit_price?.checked_mul(bought)?;
    held_value.checked_add(bought_value)?.checked_div(total)
}

/// Cost basis of an instrument right after one of its transactions.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VwapSnapshot {
    pub instrument_id: String,
    pub timestamp: NaiveDateTime,
    pub net_quantity: Decimal,
    pub average_cost: Option<Decimal>,
}

impl VwapSnapshot {
    pub fn new(transaction: &Transaction, state: &PositionState) -> Self {
        VwapSnapshot {
            instrument_id: transaction.instrument_id.clone(),
            timestamp: transaction.timestamp,
            net_quantity: state.net_quantity,
            average_cost: state.average_cost,
        }
    }
}
