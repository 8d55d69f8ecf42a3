//! Message codec
//!
//! Maps wire type tags to message schemas and back. Decoding is strict:
//! an unknown tag, or a payload that does not decode as a whole (a field
//! that is cut short or runs past the declared length), is an error.

use prost::Message;
use tracing::debug;

use crate::chunk::ChunkTransport;
use crate::error::{Result, TransportError};
use crate::frame::LogicalMessage;
use crate::link::PhysicalLink;
use crate::messages::*;

macro_rules! device_messages {
    ($($name:ident = $tag:literal),* $(,)?) => {
        /// Wire type tag of each device message
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum MessageType {
            $($name = $tag,)*
        }

        impl TryFrom<u16> for MessageType {
            type Error = TransportError;

            fn try_from(tag: u16) -> Result<Self> {
                match tag {
                    $($tag => Ok(MessageType::$name),)*
                    other => Err(TransportError::UnknownMessageType(other)),
                }
            }
        }

        /// Any message of the device protocol
        #[derive(Debug, Clone, PartialEq)]
        pub enum DeviceMessage {
            $($name($name),)*
        }

        impl DeviceMessage {
            pub fn message_type(&self) -> MessageType {
                match self {
                    $(DeviceMessage::$name(_) => MessageType::$name,)*
                }
            }

            fn encode_payload(&self) -> Vec<u8> {
                match self {
                    $(DeviceMessage::$name(message) => message.encode_to_vec(),)*
                }
            }

            fn decode_payload(message_type: MessageType, payload: &[u8]) -> Result<Self> {
                match message_type {
                    $(MessageType::$name => {
                        Ok(DeviceMessage::$name($name::decode(payload)?))
                    })*
                }
            }
        }

        $(
            impl From<$name> for DeviceMessage {
                fn from(message: $name) -> Self {
                    DeviceMessage::$name(message)
                }
            }
        )*
    };
}

device_messages! {
    DeviceInfoRequest = 1,
    DeviceInfoResponse = 2,
    RootFingerprintRequest = 3,
    RootFingerprintResponse = 4,
    BtcPubRequest = 5,
    BtcPubResponse = 6,
    BtcAddressRequest = 7,
    BtcAddressResponse = 8,
    BtcSignRequest = 9,
    BtcSignResponse = 10,
    Failure = 99,
}

impl MessageType {
    pub fn tag(self) -> u16 {
        self as u16
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Encode a message into its wire tag and payload
pub fn encode(message: &DeviceMessage) -> Result<LogicalMessage> {
    let payload = message.encode_payload();
    if u32::try_from(payload.len()).is_err() {
        return Err(TransportError::PayloadTooLarge(payload.len()));
    }
    Ok(LogicalMessage::new(message.message_type().tag(), payload))
}

/// Decode a wire tag and payload into a message
pub fn decode(message: &LogicalMessage) -> Result<DeviceMessage> {
    let message_type = MessageType::try_from(message.message_type)?;
    DeviceMessage::decode_payload(message_type, &message.payload)
}

impl<L: PhysicalLink> ChunkTransport<L> {
    /// Encode and write a typed message
    pub fn write_message(&mut self, message: &DeviceMessage) -> Result<()> {
        let logical = encode(message)?;
        debug!(
            "sending message: {} ({} bytes)",
            message.message_type(),
            logical.payload.len()
        );
        self.write(&logical)
    }

    /// Read and decode a typed message
    pub fn read_message(&mut self) -> Result<DeviceMessage> {
        let logical = self.read()?;
        let message = decode(&logical)?;
        debug!(
            "received message: {} ({} bytes)",
            message.message_type(),
            logical.payload.len()
        );
        Ok(message)
    }
}
