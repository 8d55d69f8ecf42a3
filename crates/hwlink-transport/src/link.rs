//! Physical link abstraction
//!
//! A physical link can open and close a connection and move bare reports of
//! exactly `report_len()` bytes. Everything above it works in whole messages.

use std::collections::VecDeque;
use std::io;

use crate::frame::REPORT_LEN;

/// Physical layer for the chunk transport
///
/// Implementations block until a report has been read or written. A report
/// of any size other than `report_len()` is a contract violation.
pub trait PhysicalLink {
    /// Open the underlying connection
    fn open(&mut self) -> io::Result<()>;

    /// Close the underlying connection
    fn close(&mut self) -> io::Result<()>;

    /// Read one report
    fn read_chunk(&mut self) -> io::Result<Vec<u8>>;

    /// Write one report
    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()>;

    /// Fixed report size of this link
    fn report_len(&self) -> usize {
        REPORT_LEN
    }
}

impl<L: PhysicalLink + ?Sized> PhysicalLink for Box<L> {
    fn open(&mut self) -> io::Result<()> {
        (**self).open()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }

    fn read_chunk(&mut self) -> io::Result<Vec<u8>> {
        (**self).read_chunk()
    }

    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        (**self).write_chunk(chunk)
    }

    fn report_len(&self) -> usize {
        (**self).report_len()
    }
}

/// Connection lifecycle event recorded by [`MemoryLink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    Open,
    Close,
}

/// In-memory link with scripted reads and recorded writes
#[derive(Debug)]
pub struct MemoryLink {
    reads: VecDeque<Vec<u8>>,
    writes: Vec<Vec<u8>>,
    events: Vec<LinkEvent>,
    report_len: usize,
}

impl MemoryLink {
    pub fn new() -> Self {
        Self::with_report_len(REPORT_LEN)
    }

    pub fn with_report_len(report_len: usize) -> Self {
        Self {
            reads: VecDeque::new(),
            writes: Vec::new(),
            events: Vec::new(),
            report_len,
        }
    }

    /// Queue a report to be returned by a later `read_chunk`
    pub fn queue_read(&mut self, chunk: Vec<u8>) {
        self.reads.push_back(chunk);
    }

    pub fn queue_reads<I: IntoIterator<Item = Vec<u8>>>(&mut self, chunks: I) {
        self.reads.extend(chunks);
    }

    /// Reports written so far
    pub fn written(&self) -> &[Vec<u8>] {
        &self.writes
    }

    pub fn take_written(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.writes)
    }

    /// Open/close calls in order
    pub fn events(&self) -> &[LinkEvent] {
        &self.events
    }

    pub fn pending_reads(&self) -> usize {
        self.reads.len()
    }
}

impl Default for MemoryLink {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicalLink for MemoryLink {
    fn open(&mut self) -> io::Result<()> {
        self.events.push(LinkEvent::Open);
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.events.push(LinkEvent::Close);
        Ok(())
    }

    fn read_chunk(&mut self) -> io::Result<Vec<u8>> {
        self.reads
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no report queued"))
    }

    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.writes.push(chunk.to_vec());
        Ok(())
    }

    fn report_len(&self) -> usize {
        self.report_len
    }
}
