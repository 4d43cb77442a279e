//! Build validated schemas from a [`ConfigNode`] tree.
//!
//! The root holds an `output` and/or an `input` section (optionally wrapped in a
//! single `generic` block). Each section carries its own options and an ordered list
//! of `chunk` entries:
//!
//! | option | values |
//! |--------|--------|
//! | `binary_mode` | bool, default false |
//! | `preamble`, `postamble` | literal bytes, escapes unescaped |
//! | `var_separator`, `line_separator` | `newline`, `tab`, `space`, `formfeed`, `carriagereturn`, `verticaltab` or a literal |
//! | | `line_separator` defaults to `newline`; an explicit `""` writes unterminated records |
//! | `byte_order` | `network` (default) or `host` |
//! | `binary_footer` | `none` (default), `length`, `magic:<u32>` |
//! | `record_length` | authoritative binary record length |
//! | `wrapper` | `kiss` or `stxetx` |
//!
//! Chunk entries: `type`, `name`, `format`, `offset`, `factor`, `min`, `max`,
//! `wrap`, `relative`, and exactly one of `node` or `const`.

use crate::ascii::AsciiCodec;
use crate::binary::{BinaryCodec, Endianness};
use crate::codec::Codec;
use crate::config::{parse_integer, ConfigNode};
use crate::format::{FormatError, FormatSpec};
use crate::frame::Wrapper;
use crate::parser::parse_config;
use crate::schema::{BinaryFooter, Chunk, ChunkKind, ChunkSource, ProtocolDefinition, Schema};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("invalid value {value:?} for {option}: {reason}")]
    InvalidValue {
        option: String,
        value: String,
        reason: String,
    },
    #[error("unknown byte order {0:?} (expected network or host)")]
    ByteOrder(String),
    #[error("unknown binary footer {0:?} (expected none, length or magic:<value>)")]
    Footer(String),
    #[error("unknown wrapper {0:?} (expected kiss or stxetx)")]
    Wrapper(String),
    #[error("{direction}: {chunks} ASCII chunks need a non-empty var_separator")]
    EmptySeparator { direction: String, chunks: usize },
    #[error("chunk {chunk}: {source}")]
    Format {
        chunk: String,
        #[source]
        source: FormatError,
    },
    #[error("chunk {chunk}: format {format:?} does not take a {kind} value")]
    FormatMismatch {
        chunk: String,
        format: String,
        kind: &'static str,
    },
    #[error("chunk {index} needs exactly one of node or const")]
    MissingBinding { index: usize },
    #[error("chunk {chunk}: factor must be non-zero on input")]
    ZeroFactor { chunk: String },
    #[error("missing section: {0}")]
    MissingSection(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionDirection {
    Output,
    Input,
}

impl SectionDirection {
    fn name(self) -> &'static str {
        match self {
            SectionDirection::Output => "output",
            SectionDirection::Input => "input",
        }
    }
}

/// Parse definition text and load it.
pub fn load_protocol_str(source: &str) -> Result<ProtocolDefinition, ConfigError> {
    load_protocol(&parse_config(source)?)
}

/// Load both directions from a configuration tree. At least one must be present.
pub fn load_protocol(root: &ConfigNode) -> Result<ProtocolDefinition, ConfigError> {
    let root = match root.child("generic") {
        Some(generic) if root.children.len() == 1 => generic,
        _ => root,
    };
    let output = root
        .child("output")
        .map(|s| load_schema(s, SectionDirection::Output))
        .transpose()?;
    let input = root
        .child("input")
        .map(|s| load_schema(s, SectionDirection::Input))
        .transpose()?;
    if output.is_none() && input.is_none() {
        return Err(ConfigError::MissingSection("output or input".to_string()));
    }
    Ok(ProtocolDefinition { output, input })
}

/// Load a section meant for encoding.
pub fn load_output_schema(section: &ConfigNode) -> Result<Schema, ConfigError> {
    load_schema(section, SectionDirection::Output)
}

/// Load a section meant for decoding.
pub fn load_input_schema(section: &ConfigNode) -> Result<Schema, ConfigError> {
    load_schema(section, SectionDirection::Input)
}

fn load_schema(section: &ConfigNode, direction: SectionDirection) -> Result<Schema, ConfigError> {
    let binary = section.bool("binary_mode")?.unwrap_or(false);

    let mut chunks = Vec::new();
    for (index, entry) in section.children_named("chunk").enumerate() {
        chunks.push(load_chunk(entry, index, binary, direction)?);
    }

    let codec = if binary {
        Codec::Binary(load_binary_codec(section, &chunks, direction)?)
    } else {
        let var_separator = separator(section.string("var_separator"));
        let line_separator = separator(Some(section.string("line_separator").unwrap_or("newline")));
        if chunks.len() > 1 && var_separator.is_empty() {
            return Err(ConfigError::EmptySeparator {
                direction: direction.name().to_string(),
                chunks: chunks.len(),
            });
        }
        Codec::Ascii(AsciiCodec::new(var_separator, line_separator))
    };

    let wrapper = match section.string("wrapper").map(str::trim) {
        None | Some("") => None,
        Some(name) => {
            Some(Wrapper::from_name(name).ok_or_else(|| ConfigError::Wrapper(name.to_string()))?)
        }
    };

    let schema = Schema {
        chunks,
        codec,
        wrapper,
        preamble: unescape(section.string("preamble").unwrap_or("")),
        postamble: unescape(section.string("postamble").unwrap_or("")),
    };
    debug!(
        direction = direction.name(),
        chunks = schema.chunks.len(),
        binary,
        record_length = ?schema.record_length(),
        "loaded schema"
    );
    Ok(schema)
}

fn load_chunk(
    entry: &ConfigNode,
    index: usize,
    binary: bool,
    direction: SectionDirection,
) -> Result<Chunk, ConfigError> {
    let kind = ChunkKind::from_name(entry.string("type").unwrap_or("int"));
    let source = match (entry.string("node"), entry.string("const")) {
        (Some(path), None) if !path.trim().is_empty() => ChunkSource::Node(path.trim().to_string()),
        (None, Some(literal)) => ChunkSource::Const(literal.to_string()),
        _ => return Err(ConfigError::MissingBinding { index }),
    };
    let name = match (entry.string("name"), &source) {
        (Some(n), _) => n.to_string(),
        (None, ChunkSource::Node(path)) => path.clone(),
        (None, ChunkSource::Const(_)) => format!("const#{}", index),
    };

    let format = if binary {
        FormatSpec::parse(kind.default_format()).map_err(|source| ConfigError::Format {
            chunk: name.clone(),
            source,
        })?
    } else {
        let raw = match entry.string("format") {
            Some(f) => String::from_utf8_lossy(&unescape(f)).into_owned(),
            None => kind.default_format().to_string(),
        };
        let spec = FormatSpec::parse(&raw).map_err(|source| ConfigError::Format {
            chunk: name.clone(),
            source,
        })?;
        if spec.class() != kind.conversion_class() {
            return Err(ConfigError::FormatMismatch {
                chunk: name,
                format: raw,
                kind: kind.name(),
            });
        }
        spec
    };

    let factor = entry.f64("factor")?.unwrap_or(1.0);
    if direction == SectionDirection::Input && kind.is_numeric() && factor == 0.0 {
        return Err(ConfigError::ZeroFactor { chunk: name });
    }

    Ok(Chunk {
        kind,
        format,
        offset: entry.f64("offset")?.unwrap_or(0.0),
        factor,
        min: entry.f64("min")?.unwrap_or(0.0),
        max: entry.f64("max")?.unwrap_or(0.0),
        wrap: entry.bool("wrap")?.unwrap_or(false),
        relative: entry.bool("relative")?.unwrap_or(false),
        source,
        name,
    })
}

fn load_binary_codec(
    section: &ConfigNode,
    chunks: &[Chunk],
    direction: SectionDirection,
) -> Result<BinaryCodec, ConfigError> {
    let endianness = match section.string("byte_order").map(|s| s.trim().to_ascii_lowercase()) {
        None => Endianness::Network,
        Some(s) if s == "network" => Endianness::Network,
        Some(s) if s == "host" => Endianness::Host,
        Some(other) => return Err(ConfigError::ByteOrder(other)),
    };
    let footer = match section.string("binary_footer") {
        None => BinaryFooter::None,
        Some(raw) => parse_footer(raw)?,
    };

    let computed = static_record_length(chunks) + footer.width();
    let record_length = match section.i64("record_length")? {
        None => computed,
        Some(n) if n >= 0 && n as usize >= computed => n as usize,
        Some(n) => {
            warn!(
                configured = n,
                computed, "record_length smaller than the chunk layout, using computed length"
            );
            computed
        }
    };

    if direction == SectionDirection::Input {
        if let Some(chunk) = chunks.iter().find(|c| c.kind == ChunkKind::String) {
            warn!(
                chunk = chunk.name.as_str(),
                "binary input schema contains a string chunk; it is skipped on decode and later fields may be misaligned"
            );
        }
    }
    Ok(BinaryCodec::new(endianness, footer, record_length))
}

/// Sum of fixed chunk widths; strings contribute nothing.
pub fn static_record_length(chunks: &[Chunk]) -> usize {
    chunks.iter().filter_map(|c| c.kind.static_width()).sum()
}

fn parse_footer(raw: &str) -> Result<BinaryFooter, ConfigError> {
    let s = raw.trim();
    match s.to_ascii_lowercase().as_str() {
        "" | "none" => return Ok(BinaryFooter::None),
        "length" => return Ok(BinaryFooter::Length),
        _ => {}
    }
    let value = s
        .strip_prefix("magic")
        .and_then(|rest| rest.strip_prefix(':').or_else(|| rest.strip_prefix(',')))
        .ok_or_else(|| ConfigError::Footer(raw.to_string()))?;
    let magic = parse_integer(value)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| ConfigError::InvalidValue {
            option: "binary_footer".to_string(),
            value: raw.to_string(),
            reason: "magic must be a 32-bit unsigned integer".to_string(),
        })?;
    Ok(BinaryFooter::Magic(magic))
}

/// Resolve a separator option: a symbolic name or an unescaped literal.
pub fn separator(raw: Option<&str>) -> Vec<u8> {
    match raw {
        None => Vec::new(),
        Some("newline") => b"\n".to_vec(),
        Some("tab") => b"\t".to_vec(),
        Some("space") => b" ".to_vec(),
        Some("formfeed") => b"\x0c".to_vec(),
        Some("carriagereturn") => b"\r".to_vec(),
        Some("verticaltab") => b"\x0b".to_vec(),
        Some(literal) => unescape(literal),
    }
}

/// Expand C escape sequences (`\n`, `\t`, `\r`, `\f`, `\v`, `\a`, `\b`, `\\`,
/// `\"`, `\'`, `\?`, `\xHH`, `\ooo`) into raw bytes. Unknown escapes keep the
/// escaped character.
pub fn unescape(s: &str) -> Vec<u8> {
    let b = s.as_bytes();
    let mut out = Vec::with_capacity(b.len());
    let mut i = 0;
    while i < b.len() {
        if b[i] != b'\\' || i + 1 >= b.len() {
            out.push(b[i]);
            i += 1;
            continue;
        }
        i += 1;
        let c = b[i];
        i += 1;
        match c {
            b'n' => out.push(b'\n'),
            b't' => out.push(b'\t'),
            b'r' => out.push(b'\r'),
            b'f' => out.push(0x0c),
            b'v' => out.push(0x0b),
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'x' => {
                let mut v: u32 = 0;
                let mut n = 0;
                while n < 2 && i < b.len() && b[i].is_ascii_hexdigit() {
                    v = v * 16 + (b[i] as char).to_digit(16).unwrap_or(0);
                    i += 1;
                    n += 1;
                }
                if n == 0 {
                    out.push(b'x');
                } else {
                    out.push(v as u8);
                }
            }
            b'0'..=b'7' => {
                let mut v: u32 = (c - b'0') as u32;
                let mut n = 1;
                while n < 3 && i < b.len() && (b'0'..=b'7').contains(&b[i]) {
                    v = v * 8 + (b[i] - b'0') as u32;
                    i += 1;
                    n += 1;
                }
                out.push(v as u8);
            }
            other => out.push(other),
        }
    }
    out
}
