//! Encode/decode records from a schema and the host bindings.
//!
//! [`Codec`] selects the ASCII or binary rendition for a direction. Both share the
//! affine transform and the way decoded values are stored (including `relative`
//! chunks), which live here.

use crate::ascii::AsciiCodec;
use crate::binary::BinaryCodec;
use crate::binding::{Bindings, DataModel};
use crate::schema::{Chunk, ChunkKind};
use crate::value::Value;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("record length mismatch: expected {expected} bytes, got {actual}")]
    RecordLength { expected: usize, actual: usize },
    #[error("footer mismatch: expected {expected:#010x}, got {actual:#010x}")]
    Footer { expected: u32, actual: u32 },
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// What one decode call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeSummary {
    /// Chunks whose field was parsed and applied.
    pub applied: usize,
    /// Chunks skipped (unsupported in this mode).
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Codec {
    Ascii(AsciiCodec),
    Binary(BinaryCodec),
}

impl Codec {
    pub fn encode<M: DataModel>(
        &self,
        chunks: &[Chunk],
        bindings: &mut Bindings<'_, M>,
    ) -> Result<Vec<u8>, CodecError> {
        match self {
            Codec::Ascii(c) => c.encode(chunks, bindings),
            Codec::Binary(c) => c.encode(chunks, bindings),
        }
    }

    pub fn decode<M: DataModel>(
        &self,
        chunks: &[Chunk],
        record: &[u8],
        bindings: &mut Bindings<'_, M>,
    ) -> Result<DecodeSummary, CodecError> {
        match self {
            Codec::Ascii(c) => c.decode(chunks, record, bindings),
            Codec::Binary(c) => c.decode(chunks, record, bindings),
        }
    }
}

/// Host value of a numeric chunk with the affine transform applied.
pub(crate) fn wire_number<M: DataModel>(chunk: &Chunk, bindings: &mut Bindings<'_, M>) -> f64 {
    let value = bindings.read(chunk);
    let host = match chunk.kind {
        ChunkKind::Byte | ChunkKind::Word | ChunkKind::Int => value.as_int() as f64,
        ChunkKind::Fixed | ChunkKind::Float => value.as_f32() as f64,
        _ => value.as_f64(),
    };
    chunk.to_wire(host)
}

/// Store a received bool. Relative chunks toggle on `true` and ignore `false`.
pub(crate) fn store_bool<M: DataModel>(chunk: &Chunk, received: bool, bindings: &mut Bindings<'_, M>) {
    if !chunk.relative {
        bindings.write(chunk, Value::Bool(received));
    } else if received {
        let current = bindings.read(chunk).as_bool();
        bindings.write(chunk, Value::Bool(!current));
    }
}

/// Store a received number already mapped back to host units.
pub(crate) fn store_number<M: DataModel>(chunk: &Chunk, host: f64, bindings: &mut Bindings<'_, M>) {
    let v = if chunk.relative {
        let current = bindings.read(chunk).as_f64();
        chunk.apply_relative(current, host)
    } else {
        host
    };
    let value = match chunk.kind {
        ChunkKind::Byte | ChunkKind::Word | ChunkKind::Int => Value::Int(v as i32),
        ChunkKind::Fixed | ChunkKind::Float => Value::Float(v as f32),
        _ => Value::Double(v),
    };
    bindings.write(chunk, value);
}
