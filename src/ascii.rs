//! ASCII records: printf-rendered fields joined by a variable separator and
//! terminated by a line separator.

use crate::binding::{Bindings, DataModel};
use crate::codec::{store_bool, store_number, wire_number, CodecError, DecodeSummary};
use crate::format::{parse_leading_float, parse_leading_int};
use crate::schema::{Chunk, ChunkKind};
use crate::value::Value;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AsciiCodec {
    var_separator: Vec<u8>,
    line_separator: Vec<u8>,
}

impl AsciiCodec {
    pub fn new(var_separator: impl Into<Vec<u8>>, line_separator: impl Into<Vec<u8>>) -> Self {
        AsciiCodec {
            var_separator: var_separator.into(),
            line_separator: line_separator.into(),
        }
    }

    pub fn var_separator(&self) -> &[u8] {
        &self.var_separator
    }

    pub fn line_separator(&self) -> &[u8] {
        &self.line_separator
    }

    pub fn encode<M: DataModel>(
        &self,
        chunks: &[Chunk],
        bindings: &mut Bindings<'_, M>,
    ) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 {
                out.extend_from_slice(&self.var_separator);
            }
            let text = match chunk.kind {
                ChunkKind::Bool => chunk.format.render_int(bindings.read(chunk).as_bool() as i64),
                ChunkKind::Byte | ChunkKind::Word | ChunkKind::Int => {
                    chunk.format.render_int(wire_number(chunk, bindings) as i64)
                }
                ChunkKind::Fixed | ChunkKind::Float | ChunkKind::Double => {
                    chunk.format.render_float(wire_number(chunk, bindings))
                }
                ChunkKind::String => chunk.format.render_str(&bindings.read(chunk).as_string()),
            };
            out.extend_from_slice(text.as_bytes());
        }
        out.extend_from_slice(&self.line_separator);
        Ok(out)
    }

    /// Decode one line. A missing line separator is logged, not rejected, and a lone
    /// trailing delimiter byte is still removed; a line with fewer fields than chunks
    /// leaves the trailing chunks untouched.
    pub fn decode<M: DataModel>(
        &self,
        chunks: &[Chunk],
        line: &[u8],
        bindings: &mut Bindings<'_, M>,
    ) -> Result<DecodeSummary, CodecError> {
        let mut body = line;
        if !self.line_separator.is_empty() {
            match body.strip_suffix(self.line_separator.as_slice()) {
                Some(stripped) => body = stripped,
                None => {
                    warn!(len = line.len(), "line does not end with the line separator");
                    // Line readers stop at the separator's last byte; drop it if present.
                    if let Some(&delimiter) = self.line_separator.last() {
                        body = body.strip_suffix(&[delimiter]).unwrap_or(body);
                    }
                }
            }
        }

        let mut summary = DecodeSummary::default();
        for (chunk, field) in chunks.iter().zip(split_fields(body, &self.var_separator, chunks.len())) {
            let text = String::from_utf8_lossy(field);
            match chunk.kind {
                ChunkKind::Bool => store_bool(chunk, parse_leading_float(&text) != 0.0, bindings),
                ChunkKind::Byte | ChunkKind::Word | ChunkKind::Int => {
                    let wire = parse_leading_int(&text) as f64;
                    store_number(chunk, chunk.from_wire(wire), bindings)
                }
                ChunkKind::Fixed | ChunkKind::Float => {
                    let wire = parse_leading_float(&text) as f32 as f64;
                    store_number(chunk, chunk.from_wire(wire), bindings)
                }
                ChunkKind::Double => {
                    let wire = parse_leading_float(&text);
                    store_number(chunk, chunk.from_wire(wire), bindings)
                }
                ChunkKind::String => {
                    bindings.write(chunk, Value::String(text.into_owned()));
                }
            }
            summary.applied += 1;
        }
        Ok(summary)
    }
}

/// Split into at most `max` fields; the last field takes the remainder.
fn split_fields<'a>(body: &'a [u8], separator: &[u8], max: usize) -> Vec<&'a [u8]> {
    if max == 0 || body.is_empty() {
        return Vec::new();
    }
    if separator.is_empty() {
        return vec![body];
    }
    let mut fields = Vec::with_capacity(max);
    let mut rest = body;
    while fields.len() + 1 < max {
        match rest.windows(separator.len()).position(|w| w == separator) {
            Some(p) => {
                fields.push(&rest[..p]);
                rest = &rest[p + separator.len()..];
            }
            None => break,
        }
    }
    fields.push(rest);
    fields
}
