//! hwlink Core - Shared types and keypath policy
//!
//! This crate provides the vocabulary every other hwlink layer speaks:
//! the target network, the closed set of script types a signing device
//! supports, and the policy deciding which BIP32 keypaths it will derive.

pub mod error;
pub mod keypath;
pub mod types;

pub use error::{CoreError, KeypathError, Result};
pub use keypath::{check_address_path, classify, format_path, parse_path};
pub use types::{Network, ScriptType, HARDENED};

/// Highest account index (unhardened) a device will derive
pub const MAX_ACCOUNT: u32 = 99;

/// Highest receive/change address index accepted for display
pub const MAX_ADDRESS_INDEX: u32 = 9999;
