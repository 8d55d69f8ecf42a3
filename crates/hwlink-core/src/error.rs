//! Error types for hwlink core

use thiserror::Error;

use crate::types::Network;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Human readable list of the keypaths a device derives
pub const SUPPORTED_KEYPATHS: &str = "m/49'/0'/<account'> for p2wpkh-p2sh\n\
m/84'/0'/<account'> for p2wpkh\n\
m/48'/0'/<account'>/2' for p2wsh multisig\n\
account can be between 0' and 99'\n\
For address keypaths, append /0/<address index> for a receive and /1/<change index> for a change address.";

/// Errors that can occur in core operations
#[derive(Debug, Error)]
pub enum CoreError {
    /// Path string could not be parsed
    #[error("Invalid derivation path: {0}")]
    InvalidPath(String),

    /// Path parsed but is outside the supported policy
    #[error(transparent)]
    Keypath(#[from] KeypathError),
}

/// A keypath the device refuses to derive
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "The device does not support the keypath {keypath} on {network}. Supported keypaths are:\n{supported}",
    supported = SUPPORTED_KEYPATHS
)]
pub struct KeypathError {
    /// Rejected path in `m/..` notation
    pub keypath: String,
    /// Network the path was checked against
    pub network: Network,
}

impl KeypathError {
    pub fn new(path: &[u32], network: Network) -> Self {
        Self {
            keypath: crate::keypath::format_path(path),
            network,
        }
    }
}
