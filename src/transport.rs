//! Byte-stream transports a session reads from and writes to.
//!
//! Reads never wait for data: `read` and `read_line` return `Ok(0)` when nothing
//! (or no complete line) is available.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

/// Which way data flows through a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
    Bidirectional,
}

impl Direction {
    pub fn is_input(self) -> bool {
        matches!(self, Direction::In | Direction::Bidirectional)
    }

    pub fn is_output(self) -> bool {
        matches!(self, Direction::Out | Direction::Bidirectional)
    }
}

pub trait Transport {
    fn open(&mut self, direction: Direction) -> io::Result<()>;

    /// Read up to `buf.len()` bytes.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Append one line, up to and including `delimiter`, to `buf`.
    fn read_line(&mut self, delimiter: u8, buf: &mut Vec<u8>) -> io::Result<usize>;

    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    fn close(&mut self) -> io::Result<()>;

    /// File transports deliver exactly the requested record length per read.
    fn is_file(&self) -> bool {
        false
    }
}

fn not_open() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "transport not open")
}

/// Queue-backed transport: bytes pushed with [`MemoryTransport::push_incoming`]
/// are read by the session, bytes written by the session accumulate in
/// [`MemoryTransport::outgoing`].
#[derive(Debug, Default)]
pub struct MemoryTransport {
    incoming: VecDeque<u8>,
    outgoing: Vec<u8>,
    open: bool,
    file_like: bool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Behave like a file: binary reads are record sized.
    pub fn file_like() -> Self {
        MemoryTransport {
            file_like: true,
            ..Self::default()
        }
    }

    pub fn push_incoming(&mut self, bytes: &[u8]) {
        self.incoming.extend(bytes);
    }

    pub fn outgoing(&self) -> &[u8] {
        &self.outgoing
    }

    pub fn take_outgoing(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl Transport for MemoryTransport {
    fn open(&mut self, _direction: Direction) -> io::Result<()> {
        self.open = true;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.open {
            return Err(not_open());
        }
        let n = buf.len().min(self.incoming.len());
        for (slot, b) in buf.iter_mut().zip(self.incoming.drain(..n)) {
            *slot = b;
        }
        Ok(n)
    }

    fn read_line(&mut self, delimiter: u8, buf: &mut Vec<u8>) -> io::Result<usize> {
        if !self.open {
            return Err(not_open());
        }
        match self.incoming.iter().position(|&b| b == delimiter) {
            Some(p) => {
                buf.extend(self.incoming.drain(..=p));
                Ok(p + 1)
            }
            None => Ok(0),
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.open {
            return Err(not_open());
        }
        self.outgoing.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn close(&mut self) -> io::Result<()> {
        self.open = false;
        Ok(())
    }

    fn is_file(&self) -> bool {
        self.file_like
    }
}

/// Reads records from one file and/or writes them to another.
#[derive(Debug)]
pub struct FileTransport {
    input_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
    reader: Option<BufReader<File>>,
    writer: Option<File>,
}

impl FileTransport {
    pub fn new(input_path: Option<PathBuf>, output_path: Option<PathBuf>) -> Self {
        FileTransport {
            input_path,
            output_path,
            reader: None,
            writer: None,
        }
    }

    pub fn reader(path: impl Into<PathBuf>) -> Self {
        Self::new(Some(path.into()), None)
    }

    pub fn writer(path: impl Into<PathBuf>) -> Self {
        Self::new(None, Some(path.into()))
    }
}

impl Transport for FileTransport {
    fn open(&mut self, direction: Direction) -> io::Result<()> {
        if direction.is_input() {
            let path = self.input_path.as_ref().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "no input file configured")
            })?;
            self.reader = Some(BufReader::new(File::open(path)?));
        }
        if direction.is_output() {
            let path = self.output_path.as_ref().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "no output file configured")
            })?;
            self.writer = Some(File::create(path)?);
        }
        Ok(())
    }

    /// Fill `buf` unless end of file comes first.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let reader = self.reader.as_mut().ok_or_else(not_open)?;
        let mut filled = 0;
        while filled < buf.len() {
            match reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    fn read_line(&mut self, delimiter: u8, buf: &mut Vec<u8>) -> io::Result<usize> {
        let reader = self.reader.as_mut().ok_or_else(not_open)?;
        reader.read_until(delimiter, buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let writer = self.writer.as_mut().ok_or_else(not_open)?;
        writer.write_all(buf)?;
        Ok(buf.len())
    }

    fn close(&mut self) -> io::Result<()> {
        if let Some(mut w) = self.writer.take() {
            w.flush()?;
        }
        self.reader = None;
        Ok(())
    }

    fn is_file(&self) -> bool {
        true
    }
}
