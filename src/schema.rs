//! Parsed, validated protocol schema: chunks, per-direction schemas, definitions.
//!
//! Schemas are built once by [`crate::loader`] and never mutated afterwards.

use crate::codec::Codec;
use crate::format::{ConversionClass, FormatSpec};
use crate::frame::Wrapper;

/// Wire type of one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    Bool,
    Byte,
    Word,
    Int,
    /// Q16.16 fixed point.
    Fixed,
    Float,
    Double,
    String,
}

impl ChunkKind {
    /// Resolve a configured type name. Unknown names fall back to `Int`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "bool" => ChunkKind::Bool,
            "byte" => ChunkKind::Byte,
            "word" => ChunkKind::Word,
            "int" => ChunkKind::Int,
            "fixed" => ChunkKind::Fixed,
            "float" => ChunkKind::Float,
            "double" => ChunkKind::Double,
            "string" => ChunkKind::String,
            other => {
                tracing::debug!(type_name = other, "unknown chunk type, using int");
                ChunkKind::Int
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChunkKind::Bool => "bool",
            ChunkKind::Byte => "byte",
            ChunkKind::Word => "word",
            ChunkKind::Int => "int",
            ChunkKind::Fixed => "fixed",
            ChunkKind::Float => "float",
            ChunkKind::Double => "double",
            ChunkKind::String => "string",
        }
    }

    /// Fixed binary width in bytes; `None` for length-prefixed strings.
    pub fn static_width(self) -> Option<usize> {
        match self {
            ChunkKind::Bool | ChunkKind::Byte => Some(1),
            ChunkKind::Word => Some(2),
            ChunkKind::Int | ChunkKind::Fixed | ChunkKind::Float => Some(4),
            ChunkKind::Double => Some(8),
            ChunkKind::String => None,
        }
    }

    /// Whether offset/factor apply.
    pub fn is_numeric(self) -> bool {
        !matches!(self, ChunkKind::Bool | ChunkKind::String)
    }

    /// Argument class an ASCII format for this kind must consume.
    pub fn conversion_class(self) -> ConversionClass {
        match self {
            ChunkKind::Bool | ChunkKind::Byte | ChunkKind::Word | ChunkKind::Int => {
                ConversionClass::Integer
            }
            ChunkKind::Fixed | ChunkKind::Float | ChunkKind::Double => ConversionClass::Floating,
            ChunkKind::String => ConversionClass::Text,
        }
    }

    pub fn default_format(self) -> &'static str {
        match self.conversion_class() {
            ConversionClass::Integer => "%d",
            ConversionClass::Floating => "%f",
            ConversionClass::Text => "%s",
        }
    }
}

/// Where a chunk's value comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkSource {
    /// Path of a value in the host data model.
    Node(String),
    /// Literal substituted for a binding; never read from or written to the model.
    Const(String),
}

/// One schema field.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub name: String,
    pub kind: ChunkKind,
    pub format: FormatSpec,
    pub offset: f64,
    pub factor: f64,
    pub min: f64,
    pub max: f64,
    pub wrap: bool,
    pub relative: bool,
    pub source: ChunkSource,
}

impl Chunk {
    /// `offset + host * factor`.
    pub fn to_wire(&self, host: f64) -> f64 {
        self.offset + host * self.factor
    }

    /// `(wire - offset) / factor`.
    pub fn from_wire(&self, wire: f64) -> f64 {
        (wire - self.offset) / self.factor
    }

    /// Combine a relative update with the current value, then clamp or wrap into
    /// `[min, max]` when `max > min`.
    pub fn apply_relative(&self, current: f64, delta: f64) -> f64 {
        let v = current + delta;
        if self.max <= self.min {
            return v;
        }
        if self.wrap {
            let range = self.max - self.min;
            self.min + (v - self.min).rem_euclid(range)
        } else {
            v.clamp(self.min, self.max)
        }
    }
}

/// Trailer appended to binary records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinaryFooter {
    #[default]
    None,
    /// Total record length including the footer.
    Length,
    Magic(u32),
}

impl BinaryFooter {
    pub fn width(self) -> usize {
        match self {
            BinaryFooter::None => 0,
            BinaryFooter::Length | BinaryFooter::Magic(_) => 4,
        }
    }
}

/// Ordered chunks and codec settings for one direction.
#[derive(Debug, Clone)]
pub struct Schema {
    pub(crate) chunks: Vec<Chunk>,
    pub(crate) codec: Codec,
    pub(crate) wrapper: Option<Wrapper>,
    pub(crate) preamble: Vec<u8>,
    pub(crate) postamble: Vec<u8>,
}

impl Schema {
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn wrapper(&self) -> Option<&Wrapper> {
        self.wrapper.as_ref()
    }

    pub fn preamble(&self) -> &[u8] {
        &self.preamble
    }

    pub fn postamble(&self) -> &[u8] {
        &self.postamble
    }

    pub fn is_binary(&self) -> bool {
        matches!(self.codec, Codec::Binary(_))
    }

    /// Fixed binary record length, `None` in ASCII mode.
    pub fn record_length(&self) -> Option<usize> {
        match &self.codec {
            Codec::Binary(b) => Some(b.record_length()),
            Codec::Ascii(_) => None,
        }
    }
}

/// Output and input schemas loaded from one configuration.
#[derive(Debug, Clone, Default)]
pub struct ProtocolDefinition {
    pub output: Option<Schema>,
    pub input: Option<Schema>,
}
