use log::{debug, error};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

use super::holdings_model::{HoldingsCalculationResult, HoldingsIssue, HoldingsRow};
use crate::errors::CalculatorError;
use crate::portfolio::vwap::{CalculatorConfig, VwapCalculator};
use crate::transactions::Transaction;

/// Running totals for one (instrument, currency) group.
#[derive(Debug, Default)]
struct HoldingsGroup {
    isin: Option<String>,
    total_quantity: Decimal,
    total_transaction_cost: Decimal,
}

/// Aggregates a transaction stream into one row per open position.
#[derive(Debug, Clone, Default)]
pub struct HoldingsCalculator {
    vwap_calculator: VwapCalculator,
}

impl HoldingsCalculator {
    pub fn new(config: CalculatorConfig) -> Self {
        Self {
            vwap_calculator: VwapCalculator::new(config),
        }
    }

    pub fn config(&self) -> &CalculatorConfig {
        self.vwap_calculator.config()
    }

    /// Groups transactions by instrument and currency, drops fully closed
    /// positions and attaches each survivor's final average cost.
    ///
    /// An instrument traded in more than one currency (or whose totals
    /// overflow) is reported in `issues` and gets no row.
    pub fn calculate_holdings(&self, transactions: &[Transaction]) -> HoldingsCalculationResult {
        let transactions: Vec<Transaction> = transactions
            .iter()
            .cloned()
            .map(Transaction::with_defaults)
            .collect();

        let mut groups: BTreeMap<(&str, &str), HoldingsGroup> = BTreeMap::new();
        let mut first_currency: HashMap<&str, &str> = HashMap::new();
        let mut failed: BTreeMap<&str, CalculatorError> = BTreeMap::new();

        for transaction in &transactions {
            let instrument_id = transaction.instrument_id.as_str();
            let currency = transaction.currency.as_str();

            let known_currency = *first_currency.entry(instrument_id).or_insert(currency);
            if known_currency != currency {
                failed
                    .entry(instrument_id)
                    .or_insert_with(|| CalculatorError::CurrencyMismatch {
                        instrument_id: instrument_id.to_string(),
                        first_currency: known_currency.to_string(),
                        second_currency: currency.to_string(),
                    });
            }

            let group = groups.entry((instrument_id, currency)).or_default();
            if group.isin.is_none() {
                group.isin = transaction.isin.clone();
            }
            if let Err(e) = accumulate(group, transaction) {
                failed.entry(instrument_id).or_insert(e);
            }
        }

        let snapshots = self.vwap_calculator.calculate(&transactions);
        let latest = VwapCalculator::latest_by_instrument(&snapshots);

        let rows: Vec<HoldingsRow> = groups
            .into_iter()
            .filter(|((instrument_id, _), _)| !failed.contains_key(instrument_id))
            .filter(|(_, group)| !self.config().is_flat(group.total_quantity))
            .map(|((instrument_id, currency), group)| HoldingsRow {
                instrument_id: instrument_id.to_string(),
                isin: group.isin,
                currency: currency.to_string(),
                net_quantity: group.total_quantity,
                total_transaction_cost: group.total_transaction_cost,
                average_cost: latest
                    .get(instrument_id)
                    .and_then(|snapshot| snapshot.average_cost),
            })
            .collect();

        let issues: Vec<HoldingsIssue> = failed
            .into_iter()
            .map(|(instrument_id, err)| {
                let issue = HoldingsIssue {
                    instrument_id: instrument_id.to_string(),
                    error: err,
                };
                error!("{}", issue);
                issue
            })
            .collect();

        debug!(
            "Holdings pass over {} transactions: {} open positions, {} issues",
            transactions.len(),
            rows.len(),
            issues.len()
        );

        HoldingsCalculationResult {
            rows,
            snapshots,
            issues,
        }
    }
}

/// Adds one transaction to its group's totals. Undefined quantities are
/// skipped.
fn accumulate(
    group: &mut HoldingsGroup,
    transaction: &Transaction,
) -> std::result::Result<(), CalculatorError> {
    let overflow = || {
        CalculatorError::Calculation(format!(
            "Totals overflow for {} at {}",
            transaction.instrument_id, transaction.timestamp
        ))
    };

    if let Some(quantity) = transaction.quantity {
        group.total_quantity = group
            .total_quantity
            .checked_add(quantity)
            .ok_or_else(overflow)?;
    }
    group.total_transaction_cost = group
        .total_transaction_cost
        .checked_add(transaction.cost())
        .ok_or_else(overflow)?;
    Ok(())
}
