//! Device-native signing request
//!
//! The shape a device signs from: script configurations, one record per
//! input and one per output. Built by the PSBT translator, consumed by a
//! [`DeviceApi`](crate::DeviceApi) implementation.

use hwlink_core::{Network, ScriptType};

/// Script type descriptor with its account-level keypath
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptConfig {
    pub script_type: ScriptType,
    /// e.g. m/84'/0'/0'
    pub keypath: Vec<u32>,
}

/// Input of a previous transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrevTxInput {
    pub prev_out_hash: [u8; 32],
    pub prev_out_index: u32,
    pub signature_script: Vec<u8>,
    pub sequence: u32,
}

/// Output of a previous transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrevTxOutput {
    pub value: u64,
    pub pubkey_script: Vec<u8>,
}

/// Full previous transaction, letting the device verify the spent amount
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrevTx {
    pub version: u32,
    pub locktime: u32,
    pub inputs: Vec<PrevTxInput>,
    pub outputs: Vec<PrevTxOutput>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInput {
    /// Previous txid in internal byte order
    pub prev_out_hash: [u8; 32],
    pub prev_out_index: u32,
    pub prev_out_value: u64,
    pub sequence: u32,
    /// Full keypath of the signing key
    pub keypath: Vec<u32>,
    /// Position in [`SignRequest::script_configs`]
    pub script_config_index: u32,
    pub prev_tx: Option<PrevTx>,
}

/// Script shape of an external output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    P2pkh,
    P2sh,
    P2wpkh,
    P2wsh,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignOutput {
    /// Change paying back to the device's own account, identified by keypath
    Internal {
        keypath: Vec<u32>,
        value: u64,
        script_config_index: u32,
    },
    /// Any other destination, identified by script type and hash
    External {
        kind: OutputKind,
        payload: Vec<u8>,
        value: u64,
    },
}

impl SignOutput {
    pub fn value(&self) -> u64 {
        match self {
            SignOutput::Internal { value, .. } | SignOutput::External { value, .. } => *value,
        }
    }

    pub fn is_change(&self) -> bool {
        matches!(self, SignOutput::Internal { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignRequest {
    pub network: Network,
    pub script_configs: Vec<ScriptConfig>,
    pub version: u32,
    pub locktime: u32,
    pub inputs: Vec<SignInput>,
    pub outputs: Vec<SignOutput>,
}

/// Signature returned by the device for one input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSignature {
    /// Input index
    pub index: u32,
    /// Compact r || s
    pub signature: [u8; 64],
}
