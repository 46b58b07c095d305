use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use cost_basis_core::transactions::ParseConfig;
use cost_basis_core::{CalculatorConfig, FlatSellPolicy};
use rust_decimal::Decimal;

/// Holdings and cost basis report for a broker transaction export.
#[derive(Parser, Debug, Clone)]
#[command(name = "cost-basis", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub options: Options,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Open positions with net quantity, transaction costs and average cost
    Holdings {
        /// Transaction export (CSV)
        file: PathBuf,
    },
    /// Every imported transaction with its purchase value and running VWAP
    Transactions {
        /// Transaction export (CSV)
        file: PathBuf,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct Options {
    #[arg(long, global = true, env = "CB_FORMAT", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Field delimiter: ",", ";", "\t" or "auto"
    #[arg(long, global = true, env = "CB_DELIMITER")]
    pub delimiter: Option<String>,

    /// Decimal separator: ".", "," or "auto"
    #[arg(long, global = true, env = "CB_DECIMAL_SEPARATOR")]
    pub decimal_separator: Option<String>,

    /// chrono format of the date column
    #[arg(long, global = true, env = "CB_DATE_FORMAT")]
    pub date_format: Option<String>,

    /// chrono format of the time column
    #[arg(long, global = true, env = "CB_TIME_FORMAT")]
    pub time_format: Option<String>,

    /// Currency for rows that leave it blank
    #[arg(long, global = true, env = "CB_DEFAULT_CURRENCY")]
    pub default_currency: Option<String>,

    /// Positions with an absolute quantity at or below this are flat
    #[arg(long, global = true, env = "CB_FLAT_THRESHOLD", default_value = "0")]
    pub flat_threshold: Decimal,

    /// Keep the previous average cost when selling from a flat position
    #[arg(long, global = true)]
    pub keep_cost_basis_on_flat_sell: bool,

    /// Reduce instruments on parallel workers
    #[arg(long, global = true, env = "CB_PARALLEL")]
    pub parallel: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            format: OutputFormat::Text,
            delimiter: None,
            decimal_separator: None,
            date_format: None,
            time_format: None,
            default_currency: None,
            flat_threshold: Decimal::ZERO,
            keep_cost_basis_on_flat_sell: false,
            parallel: false,
        }
    }
}

impl Options {
    pub fn parse_config(&self) -> ParseConfig {
        ParseConfig {
            delimiter: self.delimiter.clone(),
            decimal_separator: self.decimal_separator.clone(),
            date_format: self.date_format.clone(),
            time_format: self.time_format.clone(),
            default_currency: self.default_currency.clone(),
            ..Default::default()
        }
    }

    pub fn calculator_config(&self) -> CalculatorConfig {
        CalculatorConfig {
            flat_quantity_threshold: self.flat_threshold.abs(),
            flat_sell_policy: if self.keep_cost_basis_on_flat_sell {
                FlatSellPolicy::KeepCostBasis
            } else {
                FlatSellPolicy::ClearCostBasis
            },
            parallel: self.parallel,
        }
    }
}
