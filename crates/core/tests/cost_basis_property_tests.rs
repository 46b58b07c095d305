//! Property-based tests for the VWAP engine and holdings aggregator.
//!
//! These tests verify that universal properties hold across generated
//! transaction streams, using the `proptest` crate.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use cost_basis_core::{CalculatorConfig, HoldingsCalculator, Transaction, VwapCalculator};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;

// =============================================================================
// Generators
// =============================================================================

fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 1, 2)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

/// Builds transactions at one-minute intervals in the given order.
fn sequence(instrument: &str, legs: &[(i64, i64)]) -> Vec<Transaction> {
    legs.iter()
        .enumerate()
        .map(|(i, (qty, cents))| {
            Transaction::new(
                instrument,
                base_time() + Duration::minutes(i as i64),
                Decimal::from(*qty),
                Decimal::new(*cents, 2),
                "EUR",
            )
        })
        .collect()
}

/// A buy: (quantity, price in cents).
fn arb_buy() -> impl Strategy<Value = (i64, i64)> {
    (1i64..1_000, 1i64..1_000_000)
}

/// A buy or a sell of up to 500 units.
fn arb_leg() -> impl Strategy<Value = (i64, i64)> {
    (-500i64..500, 1i64..1_000_000)
}

/// Legs spread over a handful of instruments, shuffled in time.
fn arb_portfolio() -> impl Strategy<Value = Vec<(String, i64, i64, i64)>> {
    proptest::collection::vec(
        (
            prop_oneof![Just("A"), Just("B"), Just("C"), Just("D")],
            -20i64..20,
            1i64..100_000,
            0i64..50,
        ),
        0..60,
    )
    .prop_map(|legs| {
        legs.into_iter()
            .map(|(id, qty, cents, minute)| (id.to_string(), qty, cents, minute))
            .collect()
    })
}

fn portfolio_transactions(legs: &[(String, i64, i64, i64)]) -> Vec<Transaction> {
    legs.iter()
        .map(|(id, qty, cents, minute)| {
            Transaction::new(
                id.as_str(),
                base_time() + Duration::minutes(*minute),
                Decimal::from(*qty),
                Decimal::new(*cents, 2),
                "EUR",
            )
        })
        .collect()
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// For buys only, the final average cost is the classic weighted mean.
    #[test]
    fn prop_buy_only_average_is_weighted_mean(
        buys in proptest::collection::vec(arb_buy(), 1..30)
    ) {
        let transactions = sequence("X", &buys);
        let snapshots = VwapCalculator::default().calculate(&transactions);

        let total_value: Decimal = transactions
            .iter()
            .map(|t| t.quantity.unwrap_or_default() * t.unit_price.unwrap_or_default())
            .sum();
        let total_quantity: Decimal = transactions
            .iter()
            .map(|t| t.quantity.unwrap_or_default())
            .sum();
        let expected = total_value / total_quantity;

        let actual = snapshots.last().and_then(|s| s.average_cost).unwrap();
        prop_assert!(
            (actual - expected).abs() < Decimal::new(1, 12),
            "average {} differs from weighted mean {}", actual, expected
        );
        prop_assert_eq!(snapshots.last().unwrap().net_quantity, total_quantity);
    }

    /// A sell against a non-flat position never changes the average cost.
    #[test]
    fn prop_sell_leaves_average_unchanged(
        legs in proptest::collection::vec(arb_leg(), 1..40)
    ) {
        let transactions = sequence("X", &legs);
        let snapshots = VwapCalculator::default().calculate(&transactions);

        for i in 1..snapshots.len() {
            let previous = &snapshots[i - 1];
            if transactions[i].is_sell() && !previous.net_quantity.is_zero() {
                prop_assert_eq!(snapshots[i].average_cost, previous.average_cost);
            }
        }
    }

    /// Closing a position and buying again restarts from the new price.
    #[test]
    fn prop_reopen_restarts_average(
        history in proptest::collection::vec(arb_buy(), 1..20),
        reopen in arb_buy()
    ) {
        let held: i64 = history.iter().map(|(q, _)| q).sum();
        let mut legs = history.clone();
        legs.push((-held, 100));
        legs.push(reopen);

        let snapshots = VwapCalculator::default().calculate(&sequence("X", &legs));

        let last = snapshots.last().unwrap();
        prop_assert_eq!(last.average_cost, Some(Decimal::new(reopen.1, 2)));
        prop_assert_eq!(last.net_quantity, Decimal::from(reopen.0));
    }

    /// A sell while flat leaves no cost basis.
    #[test]
    fn prop_sell_while_flat_is_undefined(
        quantity in 1i64..1_000,
        cents in 1i64..1_000_000
    ) {
        let snapshots = VwapCalculator::default().calculate(&sequence("Y", &[(-quantity, cents)]));
        prop_assert_eq!(snapshots[0].average_cost, None);
        prop_assert_eq!(snapshots[0].net_quantity, Decimal::from(-quantity));
    }

    /// Running the aggregator twice yields the same rows, no row is flat, and
    /// instruments with zero lifetime quantity never appear.
    #[test]
    fn prop_holdings_idempotent_and_closed_positions_absent(legs in arb_portfolio()) {
        let transactions = portfolio_transactions(&legs);
        let calculator = HoldingsCalculator::default();

        let first = calculator.calculate_holdings(&transactions);
        let second = calculator.calculate_holdings(&transactions);
        prop_assert_eq!(&first.rows, &second.rows);

        let mut lifetime: HashMap<&str, Decimal> = HashMap::new();
        for t in &transactions {
            *lifetime.entry(t.instrument_id.as_str()).or_default() += t.quantity.unwrap_or_default();
        }
        for row in &first.rows {
            prop_assert!(!row.net_quantity.is_zero());
            prop_assert_eq!(Some(&row.net_quantity), lifetime.get(row.instrument_id.as_str()));
        }
        for (instrument, total) in lifetime {
            let present = first.rows.iter().any(|r| r.instrument_id == instrument);
            prop_assert_eq!(present, !total.is_zero());
        }
    }

    /// Partitioned (parallel) reduction matches the sequential one.
    #[test]
    fn prop_parallel_matches_sequential(legs in arb_portfolio()) {
        let transactions = portfolio_transactions(&legs);
        let parallel = VwapCalculator::new(CalculatorConfig {
            parallel: true,
            ..Default::default()
        });

        prop_assert_eq!(
            parallel.calculate(&transactions),
            VwapCalculator::default().calculate(&transactions)
        );
    }
}
