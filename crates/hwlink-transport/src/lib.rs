//! hwlink Transport - Chunked framing and device messages
//!
//! This crate turns a physical link that can only move fixed-size reports
//! into a channel of whole, typed device messages:
//! - `link` - the contract a physical link (USB HID, bridge, ...) fulfils
//! - `frame` - the `?##` report framing and chunk arithmetic
//! - `chunk` - the chunk transport with reference-counted sessions
//! - `messages` / `codec` - the protobuf message set and its type registry

pub mod chunk;
pub mod codec;
pub mod error;
pub mod frame;
pub mod link;
pub mod messages;

pub use chunk::ChunkTransport;
pub use codec::{DeviceMessage, MessageType};
pub use error::{Result, TransportError};
pub use frame::{LogicalMessage, REPORT_LEN};
pub use link::{LinkEvent, MemoryLink, PhysicalLink};
