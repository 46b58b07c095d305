use log::debug;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};

use super::vwap_model::{CalculatorConfig, PositionState, VwapSnapshot};
use crate::transactions::Transaction;

/// Computes the running volume-weighted average price of every instrument
/// in a transaction stream.
///
/// Transactions are walked in timestamp order (stable, so equal timestamps
/// keep their input order) and one snapshot is produced per transaction.
/// Per-instrument state only lives for the duration of one `calculate` call.
#[derive(Debug, Clone, Default)]
pub struct VwapCalculator {
    config: CalculatorConfig,
}

impl VwapCalculator {
    pub fn new(config: CalculatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CalculatorConfig {
        &self.config
    }

    /// Returns one snapshot per transaction; `result[i]` belongs to
    /// `transactions[i]` and reflects the state after applying it.
    pub fn calculate(&self, transactions: &[Transaction]) -> Vec<VwapSnapshot> {
        let order = chronological_order(transactions);
        debug!(
            "Calculating VWAP over {} transactions (parallel: {})",
            transactions.len(),
            self.config.parallel
        );

        let placed = if self.config.parallel {
            self.reduce_partitioned(transactions, &order)
        } else {
            self.reduce_sequential(transactions, &order)
        };

        let mut slots: Vec<Option<VwapSnapshot>> = vec![None; transactions.len()];
        for (index, snapshot) in placed {
            slots[index] = Some(snapshot);
        }
        slots.into_iter().flatten().collect()
    }

    fn reduce_sequential(
        &self,
        transactions: &[Transaction],
        order: &[usize],
    ) -> Vec<(usize, VwapSnapshot)> {
        let mut states: HashMap<&str, PositionState> = HashMap::new();
        order
            .iter()
            .map(|&index| {
                let transaction = &transactions[index];
                let state = states
                    .entry(transaction.instrument_id.as_str())
                    .or_default();
                state.apply(transaction, &self.config);
                (index, VwapSnapshot::new(transaction, state))
            })
            .collect()
    }

    /// Splits the stream per instrument and reduces each partition on its own
    /// worker. Each worker owns exactly one `PositionState`.
    fn reduce_partitioned(
        &self,
        transactions: &[Transaction],
        order: &[usize],
    ) -> Vec<(usize, VwapSnapshot)> {
        let mut partitions: HashMap<&str, Vec<usize>> = HashMap::new();
        for &index in order {
            partitions
                .entry(transactions[index].instrument_id.as_str())
                .or_default()
                .push(index);
        }
        let partitions: Vec<Vec<usize>> = partitions.into_values().collect();

        partitions
            .into_par_iter()
            .flat_map_iter(|indices| {
                let mut state = PositionState::default();
                indices
                    .into_iter()
                    .map(|index| {
                        let transaction = &transactions[index];
                        state.apply(transaction, &self.config);
                        (index, VwapSnapshot::new(transaction, &state))
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Picks the last snapshot of each instrument in timestamp order
    /// (later input position wins on equal timestamps).
    pub fn latest_by_instrument(snapshots: &[VwapSnapshot]) -> BTreeMap<String, VwapSnapshot> {
        let mut latest: BTreeMap<String, VwapSnapshot> = BTreeMap::new();
        for snapshot in snapshots {
            match latest.get(&snapshot.instrument_id) {
                Some(current) if current.timestamp > snapshot.timestamp => {}
                _ => {
                    latest.insert(snapshot.instrument_id.clone(), snapshot.clone());
                }
            }
        }
        latest
    }
}

/// Input indices sorted by timestamp. `sort_by_key` is stable.
fn chronological_order(transactions: &[Transaction]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..transactions.len()).collect();
    order.sort_by_key(|&index| transactions[index].timestamp);
    order
}
