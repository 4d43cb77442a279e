//! Decode a file of records through the input section of a protocol definition.
//!
//! Usage:
//!   decode_records DEFINITION RECORDS
//!
//! Runs an input session over RECORDS until the file is exhausted, then prints every
//! bound value as `path = value`. Malformed records are reported on stderr and skipped.

use anyhow::{bail, Context, Result};
use genproto::dump::format_value;
use genproto::{load_protocol_str, Direction, FileTransport, MemoryModel, ProtocolSession};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() != 2 {
        bail!("usage: decode_records DEFINITION RECORDS");
    }
    let source = std::fs::read_to_string(&args[0])
        .with_context(|| format!("reading {}", args[0]))?;
    let mut definition = load_protocol_str(&source)
        .with_context(|| format!("loading {}", args[0]))?;
    definition.output = None;

    let mut model = MemoryModel::new();
    let mut session = ProtocolSession::new(definition, Direction::In, FileTransport::reader(&args[1]))?;
    session.open().with_context(|| format!("opening {}", args[1]))?;

    let (mut decoded, mut discarded) = (0usize, 0usize);
    loop {
        let report = session.process(&mut model)?;
        if report.decoded + report.discarded == 0 {
            break;
        }
        decoded += report.decoded;
        discarded += report.discarded;
    }
    session.close()?;

    for (path, value) in model.iter() {
        println!("{} = {}", path, format_value(value));
    }
    eprintln!("{} record(s) decoded, {} discarded", decoded, discarded);
    Ok(())
}
