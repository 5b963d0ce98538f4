//! Re-check a belts report against its input document.
//!
//! Exits 0 when every constraint holds, 2 with one stderr line per
//! violation otherwise.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use factorate_model::belts::{BeltsProblem, BeltsReport};
use factorate_model::verify;

#[derive(Parser)]
#[command(name = "factorate-verify-belts")]
#[command(about = "Re-check a belts solution against its input")]
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
    let problem: BeltsProblem = factorate_cli::load_json(&cli.input)?;
    problem.validate()?;
    let report: BeltsReport = factorate_cli::load_json(&cli.output)?;
    Ok(verify::verify_belts(&problem, &report))
}
