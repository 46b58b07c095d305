use chrono::NaiveDateTime;
use cost_basis_core::constants::{AVERAGE_COST_DISPLAY_PRECISION, DISPLAY_DECIMAL_PRECISION};
use cost_basis_core::{HoldingsRow, Transaction, VwapSnapshot};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::OutputFormat;

/// One line of the transactions report.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub instrument_id: String,
    pub isin: Option<String>,
    pub timestamp: NaiveDateTime,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub currency: String,
    pub fx_rate: Decimal,
    pub transaction_cost: Decimal,
    pub purchase_value: Option<Decimal>,
    pub base_purchase_value: Option<Decimal>,
    pub net_quantity: Decimal,
    pub average_cost: Option<Decimal>,
}

impl TransactionView {
    pub fn new(transaction: &Transaction, snapshot: &VwapSnapshot) -> Self {
        TransactionView {
            instrument_id: transaction.instrument_id.clone(),
            isin: transaction.isin.clone(),
            timestamp: transaction.timestamp,
            quantity: transaction.quantity,
            unit_price: transaction.unit_price,
            currency: transaction.currency.clone(),
            fx_rate: transaction.fx(),
            transaction_cost: transaction.cost(),
            purchase_value: transaction.purchase_value(),
            base_purchase_value: transaction.base_purchase_value(),
            net_quantity: snapshot.net_quantity,
            average_cost: snapshot.average_cost,
        }
    }
}

fn amount(value: Option<Decimal>, dp: u32) -> String {
    value
        .map(|v| v.round_dp(dp).normalize().to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn table(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let line = |cells: Vec<String>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = Vec::with_capacity(rows.len() + 1);
    out.push(line(headers.iter().map(|h| h.to_string()).collect()));
    out.extend(rows.into_iter().map(line));
    out.join("\n") + "\n"
}

pub fn render_holdings(rows: &[HoldingsRow], format: OutputFormat) -> anyhow::Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(rows)? + "\n");
    }

    let body = rows
        .iter()
        .map(|row| {
            vec![
                row.instrument_id.clone(),
                row.isin.clone().unwrap_or_default(),
                row.currency.clone(),
                amount(Some(row.net_quantity), AVERAGE_COST_DISPLAY_PRECISION),
                amount(row.average_cost, AVERAGE_COST_DISPLAY_PRECISION),
                amount(row.cost_basis(), DISPLAY_DECIMAL_PRECISION),
                amount(Some(row.total_transaction_cost), DISPLAY_DECIMAL_PRECISION),
            ]
        })
        .collect();

    Ok(table(
        &[
            "PRODUCT",
            "ISIN",
            "CURRENCY",
            "QUANTITY",
            "AVG COST",
            "COST BASIS",
            "TX COSTS",
        ],
        body,
    ))
}

pub fn render_transactions(views: &[TransactionView], format: OutputFormat) -> anyhow::Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(views)? + "\n");
    }

    let body = views
        .iter()
        .map(|view| {
            vec![
                view.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                view.instrument_id.clone(),
                amount(view.quantity, AVERAGE_COST_DISPLAY_PRECISION),
                amount(view.unit_price, AVERAGE_COST_DISPLAY_PRECISION),
                view.currency.clone(),
                amount(view.purchase_value, DISPLAY_DECIMAL_PRECISION),
                amount(view.base_purchase_value, DISPLAY_DECIMAL_PRECISION),
                amount(Some(view.net_quantity), AVERAGE_COST_DISPLAY_PRECISION),
                amount(view.average_cost, AVERAGE_COST_DISPLAY_PRECISION),
            ]
        })
        .collect();

    Ok(table(
        &[
            "DATETIME",
            "PRODUCT",
            "QUANTITY",
            "PRICE",
            "CURRENCY",
            "VALUE",
            "BASE VALUE",
            "POSITION",
            "VWAP",
        ],
        body,
    ))
}
