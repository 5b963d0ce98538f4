//! Shared plumbing for the factorate binaries.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Route diagnostics to stderr so stdout stays a single JSON document.
/// Level defaults to `warn`; override with `RUST_LOG`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Read stdin to completion before any solving starts.
pub fn read_stdin() -> Result<String> {
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("reading stdin")?;
    Ok(buffer)
}

/// Write a report document to stdout, pretty-printed with two-space indent.
pub fn emit<T: serde::Serialize>(report: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(report).context("serializing report")?;
    println!("{text}");
    Ok(())
}

/// Load and parse a JSON document from a file.
pub fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Report violations and exit with the verifier contract's status code:
/// 0 on a clean pass, 2 when anything is broken.
pub fn finish_verification(violations: Vec<String>) -> ! {
    if violations.is_empty() {
        std::process::exit(0);
    }
    for violation in &violations {
        eprintln!("violation: {violation}");
    }
    std::process::exit(2)
}
