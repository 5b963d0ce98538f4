//! Belt network solver: JSON problem on stdin, JSON report on stdout.

use anyhow::{Context, Result};
use factorate_model::belts::BeltsProblem;
use factorate_model::throughput;

fn main() {
    factorate_cli::init_logging();
    if let Err(error) = run() {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let input = factorate_cli::read_stdin()?;
    let problem: BeltsProblem =
        serde_json::from_str(&input).context("parsing belts problem from stdin")?;
    problem.validate()?;

    let report = throughput::solve(&problem)?;
    factorate_cli::emit(&report)
}
