use std::io::Write;

use clap::Parser;
use cost_basis_cli::config::{Cli, Command, Options, OutputFormat};
use cost_basis_cli::{load_transactions, run};
use cost_basis_core::{FlatSellPolicy, HoldingsRow};
use rust_decimal_macros::dec;
use tempfile::NamedTempFile;

const EXPORT: &str = "\
Datum,Tijd,Product,ISIN,Beurs,Uitvoeringsplaats,Aantal,Koers,,Lokale waarde,,Waarde,,Wisselkoers,Transactiekosten en/of,,Totaal,
03-01-2024,09:15,X,NL0000000001,EAM,XAMS,-15,\"250,00\",EUR,\"3750,00\",EUR,\"3750,00\",EUR,,\"-2,00\",EUR,\"3748,00\",EUR
02-01-2024,09:10,X,NL0000000001,EAM,XAMS,10,\"200,00\",EUR,\"-2000,00\",EUR,\"-2000,00\",EUR,,\"-2,00\",EUR,\"-2002,00\",EUR
01-01-2024,09:05,X,NL0000000001,EAM,XAMS,10,\"100,00\",EUR,\"-1000,00\",EUR,\"-1000,00\",EUR,,\"-2,00\",EUR,\"-1002,00\",EUR
04-01-2024,14:00,Y,US0000000002,NDQ,XNAS,-5,\"40,00\",USD,\"200,00\",USD,\"184,00\",EUR,\"1,0870\",\"-0,50\",EUR,\"183,50\",EUR
05-01-2024,14:00,Z,US0000000003,NDQ,XNAS,2,\"10,00\",USD,\"-20,00\",USD,\"-18,40\",EUR,\"1,0870\",,EUR,\"-18,40\",EUR
06-01-2024,14:00,Z,US0000000003,NDQ,XNAS,-2,\"11,00\",USD,\"22,00\",USD,\"20,24\",EUR,\"1,0870\",,EUR,\"20,24\",EUR
bad-date,14:00,Z,US0000000003,NDQ,XNAS,7,\"11,00\",USD,\"22,00\",USD,\"20,24\",EUR,\"1,0870\",,EUR,\"20,24\",EUR
";

fn export_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(EXPORT.as_bytes()).unwrap();
    file
}

fn cli(command: Command, format: OutputFormat) -> Cli {
    Cli {
        command,
        options: Options {
            format,
            ..Default::default()
        },
    }
}

#[test]
fn holdings_json_report() {
    let file = export_file();
    let output = run(&cli(
        Command::Holdings {
            file: file.path().to_path_buf(),
        },
        OutputFormat::Json,
    ))
    .unwrap();

    let rows: Vec<HoldingsRow> = serde_json::from_str(&output).unwrap();
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0].instrument_id, "X");
    assert_eq!(rows[0].net_quantity, dec!(5));
    assert_eq!(rows[0].average_cost, Some(dec!(150)));
    assert_eq!(rows[0].total_transaction_cost, dec!(-6));

    assert_eq!(rows[1].instrument_id, "Y");
    assert_eq!(rows[1].currency, "USD");
    assert_eq!(rows[1].net_quantity, dec!(-5));
    assert_eq!(rows[1].average_cost, None);
}

#[test]
fn holdings_text_report() {
    let file = export_file();
    let output = run(&cli(
        Command::Holdings {
            file: file.path().to_path_buf(),
        },
        OutputFormat::Text,
    ))
    .unwrap();

    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("PRODUCT"));
    assert!(lines[1].starts_with("X "));
    assert!(lines[1].contains("150"));
    assert!(lines[1].contains("750"));
    assert!(lines[2].starts_with("Y "));
    assert!(lines[2].contains(" - "));
}

#[test]
fn transactions_report_is_chronological_with_running_vwap() {
    let file = export_file();
    let output = run(&cli(
        Command::Transactions {
            file: file.path().to_path_buf(),
        },
        OutputFormat::Json,
    ))
    .unwrap();

    let views: Vec<serde_json::Value> = serde_json::from_str(&output).unwrap();
    assert_eq!(views.len(), 6);

    let vwaps: Vec<Option<f64>> = views
        .iter()
        .take(3)
        .map(|v| v["averageCost"].as_f64())
        .collect();
    assert_eq!(vwaps, vec![Some(100.0), Some(150.0), Some(150.0)]);
    assert_eq!(views[0]["purchaseValue"].as_f64(), Some(998.0));
    assert!(views[3]["averageCost"].is_null());
    let fx_rate = views[4]["fxRate"].as_f64().unwrap();
    assert!((fx_rate - 1.087).abs() < 1e-9);
}

#[test]
fn unparseable_dates_are_skipped_on_import() {
    let file = export_file();
    let imported = load_transactions(file.path(), &Options::default()).unwrap();

    assert_eq!(imported.transactions.len(), 6);
    assert_eq!(imported.warnings.len(), 1);
    assert_eq!(imported.warnings[0].row, Some(7));
}

#[test]
fn missing_file_is_an_error() {
    let result = run(&cli(
        Command::Holdings {
            file: "/nonexistent/export.csv".into(),
        },
        OutputFormat::Text,
    ));
    assert!(result.is_err());
}

#[test]
fn command_line_flags_map_to_calculator_config() {
    let cli = Cli::try_parse_from([
        "cost-basis",
        "holdings",
        "export.csv",
        "--flat-threshold",
        "0.0001",
        "--keep-cost-basis-on-flat-sell",
        "--parallel",
        "--format",
        "json",
    ])
    .unwrap();

    let config = cli.options.calculator_config();
    assert_eq!(config.flat_quantity_threshold, dec!(0.0001));
    assert_eq!(config.flat_sell_policy, FlatSellPolicy::KeepCostBasis);
    assert!(config.parallel);
    assert_eq!(cli.options.format, OutputFormat::Json);
}
