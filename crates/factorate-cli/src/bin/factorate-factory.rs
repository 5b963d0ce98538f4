//! Factory planner: JSON problem on stdin, JSON report on stdout.

use anyhow::{Context, Result};
use factorate_model::factory::FactoryProblem;
use factorate_model::planner;

fn main() {
    factorate_cli::init_logging();
    if let Err(error) = run() {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let input = factorate_cli::read_stdin()?;
    let problem: FactoryProblem =
        serde_json::from_str(&input).context("parsing factory problem from stdin")?;
    problem.validate()?;

    let report = planner::plan(&problem)?;
    factorate_cli::emit(&report)
}
