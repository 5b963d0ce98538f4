//! Re-check a factory report against its input document.
//!
//! Exits 0 when every constraint holds, 2 with one stderr line per
//! violation otherwise.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use factorate_model::factory::{FactoryProblem, FactoryReport};
use factorate_model::verify;

#[derive(Parser)]
#[command(name = "factorate-verify-factory")]
#[command(about = "Re-check a factory solution against its input")]
struct Cli {
    /// The problem document the solver consumed
    input: PathBuf,
    /// The report document the solver produced
    output: PathBuf,
}

fn main() {
    factorate_cli::init_logging();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(violations) => factorate_cli::finish_verification(violations),
        Err(error) => {
            eprintln!("error: {error:#}");
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<Vec<String>> {
    let problem: FactoryProblem = factorate_cli::load_json(&cli.input)?;
    problem.validate()?;
    let report: FactoryReport = factorate_cli::load_json(&cli.output)?;
    Ok(verify::verify_factory(&problem, &report))
}
