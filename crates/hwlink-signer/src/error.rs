//! Error types for the hwlink signer

use thiserror::Error;

use hwlink_core::{CoreError, KeypathError};
use hwlink_transport::TransportError;

/// Result type alias for signer operations
pub type Result<T> = std::result::Result<T, SignerError>;

/// Errors that can occur while talking to a signing device
#[derive(Debug, Error)]
pub enum SignerError {
    /// Framing, codec or link failure
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Path string could not be parsed
    #[error("Core error: {0}")]
    Core(CoreError),

    /// Keypath outside the device policy
    #[error(transparent)]
    Keypath(#[from] KeypathError),

    // ---- Validation, raised before any signing request is sent ----
    /// Input has neither a previous transaction nor a spent output record
    #[error("No previous output found for input {input}")]
    MissingPreviousOutput { input: usize },

    /// Previous transaction does not hash to the txid the input spends
    #[error("Input {input} has a previous transaction with the wrong hash")]
    PrevTxHashMismatch { input: usize },

    /// Spent output index does not exist in the previous transaction
    #[error("Input {input} spends output {index} which its previous transaction lacks")]
    PrevOutIndexOutOfRange { input: usize, index: u32 },

    /// No key association matches the device fingerprint
    #[error("No key found for input {input}")]
    NoSignerKey { input: usize },

    /// Script shape the device cannot sign or pay to
    #[error("Unsupported script: {0}")]
    UnsupportedScript(String),

    /// External output script is not a recognised shape
    #[error("Output type not recognized of output {output}")]
    UnrecognizedOutput { output: usize },

    /// Input asks for a sighash type other than ALL
    #[error("Only SIGHASH_ALL is supported. Found sighash {sighash} on input {input}")]
    UnsupportedSighash { input: usize, sighash: u32 },

    /// Inputs or change outputs derive from different accounts
    #[error("The bip44 account index must be the same for all inputs and changes")]
    MixedAccounts,

    /// Transaction spends nothing
    #[error("Transaction has no inputs")]
    NoInputs,

    // ---- Device reported ----
    /// User declined on the device
    #[error("{0} canceled")]
    UserCancelled(String),

    /// Device rejected the request as malformed
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Device is locked or not paired
    #[error("Device not ready: {0}")]
    DeviceNotReady(String),

    /// Device has no seed
    #[error("Not initialized")]
    NotInitialized,

    /// Operation the device does not offer
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Any other device failure
    #[error("Device error {code}: {message}")]
    Device { code: u32, message: String },

    /// Response does not fit the request
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Returned signature could not be encoded
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    // ---- Local ----
    /// PSBT could not be parsed or serialized
    #[error("PSBT error: {0}")]
    Psbt(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<CoreError> for SignerError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Keypath(e) => SignerError::Keypath(e),
            other => SignerError::Core(other),
        }
    }
}

impl From<serde_json::Error> for SignerError {
    fn from(e: serde_json::Error) -> Self {
        SignerError::Serialization(e.to_string())
    }
}

impl From<bitcoin::psbt::Error> for SignerError {
    fn from(e: bitcoin::psbt::Error) -> Self {
        SignerError::Psbt(e.to_string())
    }
}
