//! Print the record layout of a protocol definition.
//!
//! Usage:
//!   describe_protocol FILE
//!
//! Loads and validates the definition (exit code 1 on any configuration error), then
//! prints one block per direction: codec settings followed by one line per chunk.

use anyhow::{Context, Result};
use genproto::dump::describe_schema;
use genproto::load_protocol_str;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let path: PathBuf = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: describe_protocol FILE")?;
    let source = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    let definition = load_protocol_str(&source)
        .with_context(|| format!("loading {}", path.display()))?;

    if let Some(schema) = &definition.output {
        println!("output:");
        print!("{}", describe_schema(schema));
    }
    if let Some(schema) = &definition.input {
        println!("input:");
        print!("{}", describe_schema(schema));
    }
    Ok(())
}
