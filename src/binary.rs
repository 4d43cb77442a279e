//! Binary records: fixed-width fields in network or host byte order.
//!
//! | kind   | wire                                  |
//! |--------|---------------------------------------|
//! | bool   | 1 byte, 0 or 1                        |
//! | byte   | i8                                    |
//! | word   | i16                                   |
//! | int    | i32                                   |
//! | fixed  | i32, Q16.16                           |
//! | float  | f32                                   |
//! | double | f64                                   |
//! | string | u32 length + raw bytes                |
//!
//! String bytes are copied as-is; only their length prefix follows the configured
//! byte order. Strings are encode-only: decode skips them without consuming bytes.

use crate::binding::{Bindings, DataModel};
use crate::codec::{store_bool, store_number, wire_number, CodecError, DecodeSummary};
use crate::schema::{BinaryFooter, Chunk, ChunkKind};
use byteorder::{BigEndian, ByteOrder, NativeEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    /// Big-endian on the wire.
    #[default]
    Network,
    Host,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryCodec {
    endianness: Endianness,
    footer: BinaryFooter,
    record_length: usize,
}

impl BinaryCodec {
    pub fn new(endianness: Endianness, footer: BinaryFooter, record_length: usize) -> Self {
        BinaryCodec {
            endianness,
            footer,
            record_length,
        }
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub fn footer(&self) -> BinaryFooter {
        self.footer
    }

    /// Length of a record with no string chunks, footer included.
    pub fn record_length(&self) -> usize {
        self.record_length
    }

    pub fn encode<M: DataModel>(
        &self,
        chunks: &[Chunk],
        bindings: &mut Bindings<'_, M>,
    ) -> Result<Vec<u8>, CodecError> {
        match self.endianness {
            Endianness::Network => self.encode_with::<BigEndian, M>(chunks, bindings),
            Endianness::Host => self.encode_with::<NativeEndian, M>(chunks, bindings),
        }
    }

    /// Decode one record. The record must be exactly [`Self::record_length`] bytes.
    pub fn decode<M: DataModel>(
        &self,
        chunks: &[Chunk],
        record: &[u8],
        bindings: &mut Bindings<'_, M>,
    ) -> Result<DecodeSummary, CodecError> {
        if record.len() != self.record_length {
            return Err(CodecError::RecordLength {
                expected: self.record_length,
                actual: record.len(),
            });
        }
        match self.endianness {
            Endianness::Network => self.decode_with::<BigEndian, M>(chunks, record, bindings),
            Endianness::Host => self.decode_with::<NativeEndian, M>(chunks, record, bindings),
        }
    }

    fn encode_with<B: ByteOrder, M: DataModel>(
        &self,
        chunks: &[Chunk],
        bindings: &mut Bindings<'_, M>,
    ) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(self.record_length);
        for chunk in chunks {
            match chunk.kind {
                ChunkKind::Bool => out.write_u8(bindings.read(chunk).as_bool() as u8)?,
                ChunkKind::Byte => out.write_i8(wire_number(chunk, bindings) as i64 as i8)?,
                ChunkKind::Word => out.write_i16::<B>(wire_number(chunk, bindings) as i64 as i16)?,
                ChunkKind::Int => out.write_i32::<B>(wire_number(chunk, bindings) as i64 as i32)?,
                ChunkKind::Fixed => out.write_i32::<B>(to_fixed(wire_number(chunk, bindings)))?,
                ChunkKind::Float => {
                    out.write_u32::<B>((wire_number(chunk, bindings) as f32).to_bits())?
                }
                ChunkKind::Double => out.write_u64::<B>(wire_number(chunk, bindings).to_bits())?,
                ChunkKind::String => {
                    let s = bindings.read(chunk).as_string();
                    out.write_u32::<B>(s.len() as u32)?;
                    out.extend_from_slice(s.as_bytes());
                }
            }
        }

        let body_len = self.record_length.saturating_sub(self.footer.width());
        if out.len() < body_len {
            out.resize(body_len, 0);
        }
        match self.footer {
            BinaryFooter::None => {}
            BinaryFooter::Length => {
                let total = out.len() + self.footer.width();
                out.write_u32::<B>(total as u32)?;
            }
            BinaryFooter::Magic(magic) => out.write_u32::<B>(magic)?,
        }
        Ok(out)
    }

    fn decode_with<B: ByteOrder, M: DataModel>(
        &self,
        chunks: &[Chunk],
        record: &[u8],
        bindings: &mut Bindings<'_, M>,
    ) -> Result<DecodeSummary, CodecError> {
        // Verify the footer before touching the model so a rejected record leaves no trace.
        let expected = match self.footer {
            BinaryFooter::None => None,
            BinaryFooter::Length => Some(self.record_length as u32),
            BinaryFooter::Magic(magic) => Some(magic),
        };
        if let Some(expected) = expected {
            let start = record
                .len()
                .checked_sub(self.footer.width())
                .ok_or(CodecError::RecordLength {
                    expected: self.footer.width(),
                    actual: record.len(),
                })?;
            let actual = B::read_u32(&record[start..]);
            if actual != expected {
                return Err(CodecError::Footer { expected, actual });
            }
        }

        let mut r = Cursor::new(record);
        let mut summary = DecodeSummary::default();
        for chunk in chunks {
            match chunk.kind {
                ChunkKind::Bool => store_bool(chunk, r.read_u8()? != 0, bindings),
                ChunkKind::Byte => {
                    let wire = r.read_i8()? as f64;
                    store_number(chunk, chunk.from_wire(wire), bindings)
                }
                ChunkKind::Word => {
                    let wire = r.read_i16::<B>()? as f64;
                    store_number(chunk, chunk.from_wire(wire), bindings)
                }
                ChunkKind::Int => {
                    let wire = r.read_i32::<B>()? as f64;
                    store_number(chunk, chunk.from_wire(wire), bindings)
                }
                ChunkKind::Fixed => {
                    let wire = from_fixed(r.read_i32::<B>()?);
                    store_number(chunk, chunk.from_wire(wire), bindings)
                }
                ChunkKind::Float => {
                    let wire = f32::from_bits(r.read_u32::<B>()?) as f64;
                    store_number(chunk, chunk.from_wire(wire), bindings)
                }
                ChunkKind::Double => {
                    let wire = f64::from_bits(r.read_u64::<B>()?);
                    store_number(chunk, chunk.from_wire(wire), bindings)
                }
                ChunkKind::String => {
                    warn!(chunk = chunk.name.as_str(), "string chunks are not decoded from binary records");
                    summary.skipped += 1;
                    continue;
                }
            }
            summary.applied += 1;
        }
        Ok(summary)
    }
}

/// Q16.16: `round(v * 65536)`.
pub fn to_fixed(v: f64) -> i32 {
    (v * 65536.0).round() as i64 as i32
}

pub fn from_fixed(raw: i32) -> f64 {
    raw as f64 / 65536.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{BindingCache, MemoryModel};

    #[test]
    fn footer_longer_than_record_is_rejected() {
        let codec = BinaryCodec::new(Endianness::Network, BinaryFooter::Length, 2);
        let mut model = MemoryModel::new();
        let mut cache = BindingCache::new();
        let mut bindings = Bindings::new(&mut model, &mut cache);
        assert!(matches!(
            codec.decode(&[], &[0, 0], &mut bindings),
            Err(CodecError::RecordLength { expected: 4, actual: 2 })
        ));
    }

    #[test]
    fn fixed_point_conversions() {
        assert_eq!(to_fixed(1.5), 0x0001_8000);
        assert_eq!(to_fixed(-0.5), -0x8000);
        assert_eq!(from_fixed(0x0001_8000), 1.5);
    }
}
