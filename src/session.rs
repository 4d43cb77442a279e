//! One open/process/close lifecycle over a transport.
//!
//! ```text
//! Created --open()--> Open --process()*--> Open --close()--> Closed
//! ```
//!
//! A closed session cannot be reopened; build a new one.

use crate::binding::{BindingCache, Bindings, DataModel};
use crate::codec::{Codec, CodecError};
use crate::frame::FramingWrapper;
use crate::loader::ConfigError;
use crate::schema::{ProtocolDefinition, Schema};
use crate::transport::{Direction, Transport};
use std::borrow::Cow;
use std::io;
use tracing::{debug, info, warn};

/// Largest record read from a non-file transport in one cycle.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Open,
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("transport: {0}")]
    Transport(#[from] io::Error),
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },
    #[error("encode: {0}")]
    Codec(#[from] CodecError),
    #[error("cannot {operation} a session in state {state:?}")]
    InvalidState {
        state: SessionState,
        operation: &'static str,
    },
}

/// What one `process()` call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Records written.
    pub written: usize,
    /// Records or lines decoded into the model.
    pub decoded: usize,
    /// Malformed records or lines dropped.
    pub discarded: usize,
}

pub struct ProtocolSession<T: Transport, H> {
    direction: Direction,
    output: Option<Schema>,
    input: Option<Schema>,
    transport: T,
    cache: BindingCache<H>,
    state: SessionState,
}

impl<T: Transport, H: Clone> ProtocolSession<T, H> {
    /// Fails when `direction` needs a schema the definition does not have.
    pub fn new(
        definition: ProtocolDefinition,
        direction: Direction,
        transport: T,
    ) -> Result<Self, SessionError> {
        let ProtocolDefinition { output, input } = definition;
        if direction.is_output() && output.is_none() {
            return Err(ConfigError::MissingSection("output".to_string()).into());
        }
        if direction.is_input() && input.is_none() {
            return Err(ConfigError::MissingSection("input".to_string()).into());
        }
        Ok(ProtocolSession {
            direction,
            output: output.filter(|_| direction.is_output()),
            input: input.filter(|_| direction.is_input()),
            transport,
            cache: BindingCache::new(),
            state: SessionState::Created,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn output_schema(&self) -> Option<&Schema> {
        self.output.as_ref()
    }

    pub fn input_schema(&self) -> Option<&Schema> {
        self.input.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Number of bindings resolved so far.
    pub fn resolved_bindings(&self) -> usize {
        self.cache.len()
    }

    /// Open the transport and send the output preamble, if any.
    pub fn open(&mut self) -> Result<(), SessionError> {
        self.expect_state(SessionState::Created, "open")?;
        self.transport.open(self.direction)?;
        self.state = SessionState::Open;
        info!(direction = ?self.direction, "session open");

        if let Some(schema) = &self.output {
            if !schema.preamble.is_empty() {
                send(&mut self.transport, &schema.preamble)?;
            }
        }
        Ok(())
    }

    /// Run one cycle: write one output record and/or drain available input.
    pub fn process<M>(&mut self, model: &mut M) -> Result<CycleReport, SessionError>
    where
        M: DataModel<Handle = H>,
    {
        self.expect_state(SessionState::Open, "process")?;
        let mut report = CycleReport::default();
        let mut bindings = Bindings::new(model, &mut self.cache);

        if let Some(schema) = &self.output {
            let record = schema.codec.encode(&schema.chunks, &mut bindings)?;
            let framed = match &schema.wrapper {
                Some(w) => w.wrap(&record),
                None => record,
            };
            send(&mut self.transport, &framed)?;
            report.written += 1;
        }

        if let Some(schema) = &self.input {
            match &schema.codec {
                Codec::Binary(binary) => {
                    let size = if self.transport.is_file() && schema.wrapper.is_none() {
                        binary.record_length()
                    } else {
                        MAX_MESSAGE_SIZE
                    };
                    let mut buf = vec![0u8; size];
                    let n = nonblocking(self.transport.read(&mut buf))?;
                    if n > 0 {
                        buf.truncate(n);
                        decode_one(schema, &buf, &mut bindings, &mut report);
                    }
                }
                Codec::Ascii(ascii) => {
                    let delimiter = ascii.line_separator().last().copied().unwrap_or(b'\n');
                    loop {
                        let mut line = Vec::new();
                        if nonblocking(self.transport.read_line(delimiter, &mut line))? == 0 {
                            break;
                        }
                        decode_one(schema, &line, &mut bindings, &mut report);
                    }
                }
            }
        }
        Ok(report)
    }

    /// Send the postamble, if any, and close the transport. The session ends up
    /// closed even when the postamble cannot be written.
    pub fn close(&mut self) -> Result<(), SessionError> {
        self.expect_state(SessionState::Open, "close")?;
        let mut result = Ok(());
        if let Some(schema) = &self.output {
            if !schema.postamble.is_empty() {
                result = send(&mut self.transport, &schema.postamble);
            }
        }
        let closed = self.transport.close();
        self.state = SessionState::Closed;
        info!(direction = ?self.direction, "session closed");
        result?;
        closed?;
        Ok(())
    }

    fn expect_state(&self, expected: SessionState, operation: &'static str) -> Result<(), SessionError> {
        if self.state != expected {
            return Err(SessionError::InvalidState {
                state: self.state,
                operation,
            });
        }
        Ok(())
    }
}

fn send<T: Transport>(transport: &mut T, bytes: &[u8]) -> Result<(), SessionError> {
    let written = transport.write(bytes)?;
    if written != bytes.len() {
        return Err(SessionError::ShortWrite {
            written,
            expected: bytes.len(),
        });
    }
    Ok(())
}

/// `WouldBlock` means nothing to read this cycle.
fn nonblocking(result: io::Result<usize>) -> io::Result<usize> {
    match result {
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
        other => other,
    }
}

fn decode_one<M: DataModel>(
    schema: &Schema,
    raw: &[u8],
    bindings: &mut Bindings<'_, M>,
    report: &mut CycleReport,
) {
    let record = match &schema.wrapper {
        Some(w) => Cow::Owned(w.unwrap(raw)),
        None => Cow::Borrowed(raw),
    };
    match schema.codec.decode(&schema.chunks, &record, bindings) {
        Ok(summary) => {
            debug!(applied = summary.applied, skipped = summary.skipped, "decoded record");
            report.decoded += 1;
        }
        Err(e) => {
            warn!(error = %e, len = raw.len(), "discarding record");
            report.discarded += 1;
        }
    }
}
