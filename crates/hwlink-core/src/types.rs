//! Network and script type definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// High bit marking a hardened BIP32 index
pub const HARDENED: u32 = 0x8000_0000;

/// Bitcoin network the device signs for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    pub fn is_testnet(self) -> bool {
        matches!(self, Network::Testnet)
    }

    /// Hardened BIP44 coin type (0' mainnet, 1' testnet)
    pub fn coin_type(self) -> u32 {
        match self {
            Network::Mainnet => HARDENED,
            Network::Testnet => 1 | HARDENED,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => f.write_str("mainnet"),
            Network::Testnet => f.write_str("testnet"),
        }
    }
}

/// Script types a device can derive keys and sign for
///
/// Closed on purpose: adding a variant forces every match in the keypath
/// policy, the PSBT translator and the wire codec to handle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScriptType {
    /// Native segwit v0 key hash wrapped in P2SH (BIP49)
    P2wpkhP2sh,
    /// Native segwit v0 key hash (BIP84)
    P2wpkh,
    /// Segwit v0 script hash multisig (BIP48, script type 2')
    P2wshMultisig,
}

impl ScriptType {
    pub const PURPOSE_P2WPKH_P2SH: u32 = 49 | HARDENED;
    pub const PURPOSE_P2WPKH: u32 = 84 | HARDENED;
    pub const PURPOSE_MULTISIG: u32 = 48 | HARDENED;

    /// BIP48 script type component for p2wsh
    pub const MULTISIG_P2WSH: u32 = 2 | HARDENED;

    /// Hardened purpose component of paths for this script type
    pub fn purpose(self) -> u32 {
        match self {
            ScriptType::P2wpkhP2sh => Self::PURPOSE_P2WPKH_P2SH,
            ScriptType::P2wpkh => Self::PURPOSE_P2WPKH,
            ScriptType::P2wshMultisig => Self::PURPOSE_MULTISIG,
        }
    }

    /// Canonical account-level keypath, e.g. m/84'/0'/account'
    ///
    /// `account` is the hardened path component as found in a keypath.
    pub fn account_keypath(self, network: Network, account: u32) -> Vec<u32> {
        match self {
            ScriptType::P2wpkhP2sh | ScriptType::P2wpkh => {
                vec![self.purpose(), network.coin_type(), account]
            }
            ScriptType::P2wshMultisig => vec![
                self.purpose(),
                network.coin_type(),
                account,
                Self::MULTISIG_P2WSH,
            ],
        }
    }

    pub fn is_multisig(self) -> bool {
        matches!(self, ScriptType::P2wshMultisig)
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptType::P2wpkhP2sh => f.write_str("p2wpkh-p2sh"),
            ScriptType::P2wpkh => f.write_str("p2wpkh"),
            ScriptType::P2wshMultisig => f.write_str("p2wsh multisig"),
        }
    }
}
