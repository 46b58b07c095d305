use std::path::Path;

use anyhow::Context;
use cost_basis_core::transactions::{import_transactions, ColumnMapping, ImportResult};
use cost_basis_core::{HoldingsCalculator, VwapCalculator};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{Cli, Command, Options};
use crate::render::{render_holdings, render_transactions, TransactionView};

/// Logs go to stderr so report output on stdout stays machine-readable.
pub fn init_tracing() {
    let log_format = std::env::var("CB_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Reads and imports an export, logging every skipped or degraded row.
pub fn load_transactions(path: &Path, options: &Options) -> anyhow::Result<ImportResult> {
    let content =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let imported = import_transactions(&content, &options.parse_config(), &ColumnMapping::default())
        .with_context(|| format!("Failed to import {}", path.display()))?;

    for warning in &imported.warnings {
        tracing::warn!("{}: {}", path.display(), warning);
    }
    tracing::info!(
        "Imported {} transactions from {}",
        imported.transactions.len(),
        path.display()
    );
    Ok(imported)
}

/// Executes the selected command and returns the rendered report.
pub fn run(cli: &Cli) -> anyhow::Result<String> {
    let options = &cli.options;
    let config = options.calculator_config();

    match &cli.command {
        Command::Holdings { file } => {
            let imported = load_transactions(file, options)?;
            let result = HoldingsCalculator::new(config).calculate_holdings(&imported.transactions);
            for issue in &result.issues {
                tracing::warn!("{}", issue);
            }
            render_holdings(&result.rows, options.format)
        }
        Command::Transactions { file } => {
            let imported = load_transactions(file, options)?;
            let snapshots = VwapCalculator::new(config).calculate(&imported.transactions);
            let mut views: Vec<TransactionView> = imported
                .transactions
                .iter()
                .zip(&snapshots)
                .map(|(transaction, snapshot)| TransactionView::new(transaction, snapshot))
                .collect();
            views.sort_by_key(|view| view.timestamp);
            render_transactions(&views, options.format)
        }
    }
}
