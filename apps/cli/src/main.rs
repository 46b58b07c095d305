use clap::Parser;
use cost_basis_cli::{config::Cli, init_tracing, run};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing();
    let output = run(&cli)?;
    print!("{}", output);
    Ok(())
}
