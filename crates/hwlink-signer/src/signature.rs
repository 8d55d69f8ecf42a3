//! Device signature encoding
//!
//! A device returns ECDSA signatures as 64 bytes `r || s`. PSBT partial
//! signatures are DER encoded with the sighash byte appended.

use bitcoin::ecdsa;
use bitcoin::secp256k1;

use crate::error::{Result, SignerError};

/// Split a compact signature into its (r, s) halves
pub fn split_compact(compact: &[u8; 64]) -> ([u8; 32], [u8; 32]) {
    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&compact[..32]);
    s.copy_from_slice(&compact[32..]);
    (r, s)
}

/// Convert a compact device signature to a SIGHASH_ALL partial signature
pub fn to_partial_signature(compact: &[u8; 64]) -> Result<ecdsa::Signature> {
    let signature = secp256k1::ecdsa::Signature::from_compact(compact)
        .map_err(|e| SignerError::InvalidSignature(e.to_string()))?;
    Ok(ecdsa::Signature::sighash_all(signature))
}
