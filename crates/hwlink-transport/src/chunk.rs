//! Chunk transport with reference-counted sessions

use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::frame::{self, LogicalMessage};
use crate::link::PhysicalLink;

/// Upper bound on the buffer reserved up front for a declared payload length
const MAX_PREALLOC: usize = 64 * 1024;

/// Reads and writes whole messages over a [`PhysicalLink`]
///
/// The link is opened when the first session begins and closed when the
/// last one ends, so nested operations share one physical connection.
/// Not thread safe: one transport serves one caller at a time.
pub struct ChunkTransport<L: PhysicalLink> {
    link: L,
    session_depth: i32,
}

impl<L: PhysicalLink> ChunkTransport<L> {
    pub fn new(link: L) -> Self {
        Self {
            link,
            session_depth: 0,
        }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn into_inner(self) -> L {
        self.link
    }

    /// Number of sessions currently open
    pub fn session_depth(&self) -> i32 {
        self.session_depth
    }

    /// Begin a session, opening the link on the 0 -> 1 transition
    pub fn begin_session(&mut self) -> Result<()> {
        if self.session_depth == 0 {
            debug!("Opening physical link");
            self.link.open()?;
        }
        self.session_depth += 1;
        trace!(depth = self.session_depth, "Session begun");
        Ok(())
    }

    /// End a session, closing the link on the 1 -> 0 transition
    pub fn end_session(&mut self) -> Result<()> {
        if self.session_depth == 0 {
            return Err(TransportError::SessionNotOpen);
        }
        self.session_depth -= 1;
        trace!(depth = self.session_depth, "Session ended");
        if self.session_depth == 0 {
            debug!("Closing physical link");
            self.link.close()?;
        }
        Ok(())
    }

    /// Write one message as a sequence of reports
    pub fn write(&mut self, message: &LogicalMessage) -> Result<()> {
        let chunks = frame::encode_chunks(message, self.link.report_len())?;
        trace!(
            message_type = message.message_type,
            len = message.payload.len(),
            chunks = chunks.len(),
            "Writing message"
        );
        for chunk in &chunks {
            self.link.write_chunk(chunk)?;
        }
        Ok(())
    }

    /// Read one message, reassembling it from as many reports as needed
    pub fn read(&mut self) -> Result<LogicalMessage> {
        let first = self.read_chunk()?;
        let (message_type, length, data) = frame::parse_first_chunk(&first)?;
        let length = length as usize;

        let mut payload = Vec::with_capacity(length.min(MAX_PREALLOC));
        payload.extend_from_slice(data);
        while payload.len() < length {
            let chunk = self.read_chunk()?;
            payload.extend_from_slice(frame::parse_next_chunk(&chunk)?);
        }
        // Strip padding
        payload.truncate(length);

        trace!(message_type, len = length, "Read message");
        Ok(LogicalMessage::new(message_type, payload))
    }

    fn read_chunk(&mut self) -> Result<Vec<u8>> {
        let chunk = self.link.read_chunk()?;
        let expected = self.link.report_len();
        if chunk.len() != expected {
            return Err(TransportError::ChunkSize {
                expected,
                actual: chunk.len(),
            });
        }
        Ok(chunk)
    }
}
