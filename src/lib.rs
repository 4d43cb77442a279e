//! # genproto — Schema-driven generic telemetry codec
//!
//! Exchanges values of a host data model with external devices and programs over
//! byte streams. The record layout is not hand written per device: it is loaded at
//! runtime from a protocol definition describing an ordered list of typed chunks.
//!
//! ## Pieces
//!
//! - **Definition**: text parsed with a PEST grammar into a [`ConfigNode`] tree,
//!   then validated by the [`loader`] into one [`Schema`] per direction
//! - **Codecs**: ASCII (printf-style fields, variable and line separators) and binary
//!   (fixed-width fields, network or host byte order, optional footer)
//! - **Wrappers**: KISS and DLE/STX/ETX byte stuffing around an encoded record
//! - **Session**: [`ProtocolSession`] drives open / process / close over a
//!   [`Transport`], reading and writing the host through a [`DataModel`]
//!
//! ## Example definition
//!
//! ```text
//! output {
//!   binary_mode = true;
//!   byte_order = network;
//!   binary_footer = magic:0x4047;
//!   chunk { name = "gear"; type = bool; node = /controls/gear/gear-down; }
//!   chunk { name = "altitude"; type = fixed; node = /position/altitude-ft; }
//!   chunk { name = "heading"; type = word; factor = 10; node = /orientation/heading-deg; }
//! }
//! ```
//!
//! ## Usage
//!
//! See `tests/integration.rs` for sessions driven end to end over in-memory and
//! file transports.

pub mod ascii;
pub mod binary;
pub mod binding;
pub mod codec;
pub mod config;
pub mod dump;
pub mod format;
pub mod frame;
pub mod loader;
pub mod parser;
pub mod schema;
pub mod session;
pub mod transport;
pub mod value;

pub use ascii::AsciiCodec;
pub use binary::{BinaryCodec, Endianness};
pub use binding::{BindingCache, Bindings, DataModel, MemoryModel};
pub use codec::{Codec, CodecError, DecodeSummary};
pub use config::ConfigNode;
pub use frame::{FramingWrapper, KissWrapper, StxEtxWrapper, Wrapper};
pub use loader::{load_protocol, load_protocol_str, ConfigError};
pub use parser::parse_config;
pub use schema::{BinaryFooter, Chunk, ChunkKind, ChunkSource, ProtocolDefinition, Schema};
pub use session::{CycleReport, ProtocolSession, SessionError, SessionState};
pub use transport::{Direction, FileTransport, MemoryTransport, Transport};
pub use value::Value;
