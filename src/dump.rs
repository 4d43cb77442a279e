//! Human-readable schema layouts and value listings for the command-line tools.

use crate::codec::Codec;
use crate::schema::{BinaryFooter, Chunk, ChunkSource, Schema};
use crate::value::Value;
use std::fmt::Write;

/// Render separator bytes with C escapes, e.g. `"\r\n"`.
pub fn escape_bytes(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() + 2);
    s.push('"');
    for &b in bytes {
        match b {
            b'\n' => s.push_str("\\n"),
            b'\r' => s.push_str("\\r"),
            b'\t' => s.push_str("\\t"),
            b'"' => s.push_str("\\\""),
            b'\\' => s.push_str("\\\\"),
            0x20..=0x7e => s.push(b as char),
            other => {
                let _ = write!(s, "\\x{:02x}", other);
            }
        }
    }
    s.push('"');
    s
}

fn binding_label(chunk: &Chunk) -> String {
    match &chunk.source {
        ChunkSource::Node(path) => path.clone(),
        ChunkSource::Const(literal) => format!("const {:?}", literal),
    }
}

fn transform_label(chunk: &Chunk) -> String {
    if !chunk.kind.is_numeric() || (chunk.offset == 0.0 && chunk.factor == 1.0) {
        return String::new();
    }
    format!("{} + x*{}", chunk.offset, chunk.factor)
}

/// One header line plus one line per chunk. Binary layouts show byte offsets up to
/// the first string chunk, after which offsets depend on string lengths.
pub fn describe_schema(schema: &Schema) -> String {
    let mut out = String::new();
    match schema.codec() {
        Codec::Binary(b) => {
            let footer = match b.footer() {
                BinaryFooter::None => "none".to_string(),
                BinaryFooter::Length => "length".to_string(),
                BinaryFooter::Magic(m) => format!("magic {:#010x}", m),
            };
            let _ = writeln!(
                out,
                "binary, {:?} byte order, record {} bytes, footer {}",
                b.endianness(),
                b.record_length(),
                footer
            );
        }
        Codec::Ascii(a) => {
            let _ = writeln!(
                out,
                "ascii, var_separator {}, line_separator {}",
                escape_bytes(a.var_separator()),
                escape_bytes(a.line_separator())
            );
        }
    }
    if let Some(w) = schema.wrapper() {
        let _ = writeln!(out, "wrapper {}", w.name());
    }

    let mut offset = Some(0usize);
    for (i, chunk) in schema.chunks().iter().enumerate() {
        let position = match (schema.is_binary(), offset) {
            (true, Some(o)) => format!("@{:<4}", o),
            (true, None) => "@?   ".to_string(),
            (false, _) => format!("#{:<4}", i),
        };
        let width = match chunk.kind.static_width() {
            Some(w) if schema.is_binary() => w.to_string(),
            None if schema.is_binary() => "var".to_string(),
            _ => String::new(),
        };
        let _ = writeln!(
            out,
            "  {} {:<3} {:<7} {:<24} {:<16} {}{}",
            position,
            width,
            chunk.kind.name(),
            chunk.name,
            transform_label(chunk),
            binding_label(chunk),
            if chunk.relative { " (relative)" } else { "" }
        );
        offset = match (offset, chunk.kind.static_width()) {
            (Some(o), Some(w)) => Some(o + w),
            _ => None,
        };
    }
    out
}

pub fn format_value(v: &Value) -> String {
    match v {
        Value::None => "(unset)".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(x) => x.to_string(),
        Value::Float(x) => format!("{:.6}", x),
        Value::Double(x) => format!("{:.9}", x),
        Value::String(s) => format!("{:?}", s),
    }
}
