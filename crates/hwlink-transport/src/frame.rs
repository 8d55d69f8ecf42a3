//! Report framing
//!
//! A logical message is sent as a sequence of fixed-size reports:
//! ```text
//! REPORT   OFFSET  SIZE  FIELD
//! ──────────────────────────────────────────────────────
//! first    0       1     report id '?'
//!          1       2     magic "##"
//!          3       2     message type (big-endian)
//!          5       4     payload length (big-endian)
//!          9       ..    payload, zero padded
//! next     0       1     report id '?'
//!          1       ..    payload continuation, zero padded
//! ```
//! The declared length is the exact unpadded payload size.

use crate::error::{Result, TransportError};

/// Report size of the reference USB HID link
pub const REPORT_LEN: usize = 64;

/// Leading byte of every report
pub const REPORT_ID: u8 = b'?';

/// Magic following the report id in the first report
pub const MAGIC: &[u8; 2] = b"##";

/// Message type (2) + payload length (4)
pub const HEADER_LEN: usize = 6;

/// Bytes in front of the payload in the first report
pub const FIRST_REPORT_OVERHEAD: usize = 1 + MAGIC.len() + HEADER_LEN;

/// A whole message as carried by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalMessage {
    /// Registry type tag
    pub message_type: u16,
    /// Encoded message body
    pub payload: Vec<u8>,
}

impl LogicalMessage {
    pub fn new(message_type: u16, payload: Vec<u8>) -> Self {
        Self {
            message_type,
            payload,
        }
    }
}

fn check_report_len(report_len: usize) -> Result<()> {
    if report_len < FIRST_REPORT_OVERHEAD {
        return Err(TransportError::Framing(format!(
            "Report length {} cannot hold a {} byte header",
            report_len, FIRST_REPORT_OVERHEAD
        )));
    }
    Ok(())
}

/// Number of reports needed to carry a payload
pub fn chunk_count(payload_len: usize, report_len: usize) -> Result<usize> {
    check_report_len(report_len)?;
    Ok((MAGIC.len() + HEADER_LEN + payload_len).div_ceil(report_len - 1))
}

/// Split a message into the reports written to the link
pub fn encode_chunks(message: &LogicalMessage, report_len: usize) -> Result<Vec<Vec<u8>>> {
    check_report_len(report_len)?;
    let length = u32::try_from(message.payload.len())
        .map_err(|_| TransportError::PayloadTooLarge(message.payload.len()))?;

    let mut buffer = Vec::with_capacity(MAGIC.len() + HEADER_LEN + message.payload.len());
    buffer.extend_from_slice(MAGIC);
    buffer.extend_from_slice(&message.message_type.to_be_bytes());
    buffer.extend_from_slice(&length.to_be_bytes());
    buffer.extend_from_slice(&message.payload);

    let chunks = buffer
        .chunks(report_len - 1)
        .map(|data| {
            let mut chunk = Vec::with_capacity(report_len);
            chunk.push(REPORT_ID);
            chunk.extend_from_slice(data);
            chunk.resize(report_len, 0);
            chunk
        })
        .collect();
    Ok(chunks)
}

/// Parse the first report into (message type, payload length, payload data)
pub fn parse_first_chunk(chunk: &[u8]) -> Result<(u16, u32, &[u8])> {
    if chunk.len() < 3 || chunk[0] != REPORT_ID || &chunk[1..3] != MAGIC {
        return Err(TransportError::Framing(
            "Unexpected magic characters".to_string(),
        ));
    }
    if chunk.len() < FIRST_REPORT_OVERHEAD {
        return Err(TransportError::Framing("Cannot parse header".to_string()));
    }

    let message_type = u16::from_be_bytes([chunk[3], chunk[4]]);
    let length = u32::from_be_bytes([chunk[5], chunk[6], chunk[7], chunk[8]]);
    Ok((message_type, length, &chunk[FIRST_REPORT_OVERHEAD..]))
}

/// Parse a continuation report into its payload data
pub fn parse_next_chunk(chunk: &[u8]) -> Result<&[u8]> {
    match chunk.split_first() {
        Some((&REPORT_ID, data)) => Ok(data),
        _ => Err(TransportError::Framing(
            "Unexpected magic characters".to_string(),
        )),
    }
}
