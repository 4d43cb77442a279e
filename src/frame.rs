//! Framing wrappers: byte-stuffing applied around an encoded record so it can be
//! delimited on a stream transport.
//!
//! Both wrappers are pure functions of the whole buffer; no state is kept between
//! calls, so a frame split across two reads is not reassembled.

use tracing::warn;

pub const FEND: u8 = 0xC0;
pub const FESC: u8 = 0xDB;
pub const TFEND: u8 = 0xDC;
pub const TFESC: u8 = 0xDD;

/// KISS port 0, data frame.
pub const KISS_DATA_FRAME: u8 = 0x00;

pub const DLE: u8 = 0x00;
pub const STX: u8 = 0x02;
pub const ETX: u8 = 0x03;

pub trait FramingWrapper {
    fn wrap(&self, payload: &[u8]) -> Vec<u8>;
    fn unwrap(&self, frame: &[u8]) -> Vec<u8>;
}

/// KISS framing (FEND delimited, FESC escaped).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KissWrapper;

impl FramingWrapper for KissWrapper {
    fn wrap(&self, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(payload.len() + 4);
        out.push(FEND);
        out.push(KISS_DATA_FRAME);
        for &b in payload {
            match b {
                FEND => out.extend_from_slice(&[FESC, TFEND]),
                FESC => out.extend_from_slice(&[FESC, TFESC]),
                other => out.push(other),
            }
        }
        out.push(FEND);
        out
    }

    /// Extract the first frame. Bytes before the opening FEND and after the
    /// closing FEND are dropped.
    fn unwrap(&self, frame: &[u8]) -> Vec<u8> {
        let mut i = match frame.iter().position(|&b| b == FEND) {
            Some(p) => p,
            None => return Vec::new(),
        };
        while i < frame.len() && frame[i] == FEND {
            i += 1;
        }
        if i >= frame.len() {
            return Vec::new();
        }
        if frame[i] != KISS_DATA_FRAME {
            tracing::debug!(command = frame[i], "KISS frame with non-data command byte");
        }
        i += 1;

        let mut out = Vec::with_capacity(frame.len() - i);
        let mut closed = false;
        while i < frame.len() {
            let b = frame[i];
            i += 1;
            match b {
                FEND => {
                    closed = true;
                    break;
                }
                FESC => match frame.get(i) {
                    Some(&TFEND) => {
                        out.push(FEND);
                        i += 1;
                    }
                    Some(&TFESC) => {
                        out.push(FESC);
                        i += 1;
                    }
                    Some(&other) => {
                        warn!(byte = other, "invalid KISS escape, keeping byte");
                        out.push(other);
                        i += 1;
                    }
                    None => warn!("KISS frame ends inside an escape"),
                },
                other => out.push(other),
            }
        }

        if !closed {
            warn!(len = out.len(), "KISS frame missing closing FEND");
        } else if frame[i..].iter().any(|&b| b != FEND) {
            warn!(dropped = frame.len() - i, "dropping data after KISS frame");
        }
        out
    }
}

/// DLE/STX ... DLE/ETX framing with DLE doubling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StxEtxWrapper;

impl FramingWrapper for StxEtxWrapper {
    fn wrap(&self, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(payload.len() + 4);
        out.extend_from_slice(&[DLE, STX]);
        for &b in payload {
            if b == DLE {
                out.push(DLE);
            }
            out.push(b);
        }
        out.extend_from_slice(&[DLE, ETX]);
        out
    }

    /// Identity: incoming STX/ETX frames are passed to the decoder untouched.
    fn unwrap(&self, frame: &[u8]) -> Vec<u8> {
        frame.to_vec()
    }
}

/// Wrapper selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrapper {
    Kiss(KissWrapper),
    StxEtx(StxEtxWrapper),
}

impl Wrapper {
    /// `kiss` or `stxetx`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "kiss" => Some(Wrapper::Kiss(KissWrapper)),
            "stxetx" => Some(Wrapper::StxEtx(StxEtxWrapper)),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Wrapper::Kiss(_) => "kiss",
            Wrapper::StxEtx(_) => "stxetx",
        }
    }
}

impl FramingWrapper for Wrapper {
    fn wrap(&self, payload: &[u8]) -> Vec<u8> {
        match self {
            Wrapper::Kiss(w) => w.wrap(payload),
            Wrapper::StxEtx(w) => w.wrap(payload),
        }
    }

    fn unwrap(&self, frame: &[u8]) -> Vec<u8> {
        match self {
            Wrapper::Kiss(w) => w.unwrap(frame),
            Wrapper::StxEtx(w) => w.unwrap(frame),
        }
    }
}
