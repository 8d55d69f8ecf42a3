//! Keypath policy for hardware signers
//!
//! A device only derives keys under a fixed set of prefixes. Paths are
//! classified by length and by the exact purpose/coin/hardening pattern:
//!
//! ```text
//! LENGTH  PATH                                   SCRIPT TYPE
//! ──────────────────────────────────────────────────────────────
//! 3       m/49'/coin'/account'                   p2wpkh-p2sh
//! 3       m/84'/coin'/account'                   p2wpkh
//! 4       m/48'/coin'/account'/2'                p2wsh multisig
//! 5       m/49'|84'/coin'/account'/change/index  singlesig address
//! ```
//!
//! `coin'` is 0' on mainnet and 1' on testnet, `account'` lies in [0', 99'].
//! Anything else is rejected, never coerced.

use crate::error::{CoreError, KeypathError, Result};
use crate::types::{Network, ScriptType, HARDENED};
use crate::{MAX_ACCOUNT, MAX_ADDRESS_INDEX};

/// Whether a hardened account component lies in [0', 99']
pub fn is_valid_account(account: u32) -> bool {
    (HARDENED..=HARDENED + MAX_ACCOUNT).contains(&account)
}

fn singlesig_from_purpose(purpose: u32) -> Option<ScriptType> {
    match purpose {
        ScriptType::PURPOSE_P2WPKH_P2SH => Some(ScriptType::P2wpkhP2sh),
        ScriptType::PURPOSE_P2WPKH => Some(ScriptType::P2wpkh),
        _ => None,
    }
}

/// Classify a keypath into the script type it derives keys for
pub fn classify(path: &[u32], network: Network) -> std::result::Result<ScriptType, KeypathError> {
    let reject = || KeypathError::new(path, network);
    let expected_coin = network.coin_type();

    match *path {
        [purpose, coin, account] => {
            if coin != expected_coin || !is_valid_account(account) {
                return Err(reject());
            }
            singlesig_from_purpose(purpose).ok_or_else(reject)
        }
        [purpose, coin, account, script_type] => {
            if purpose != ScriptType::PURPOSE_MULTISIG
                || coin != expected_coin
                || !is_valid_account(account)
                || script_type != ScriptType::MULTISIG_P2WSH
            {
                return Err(reject());
            }
            Ok(ScriptType::P2wshMultisig)
        }
        [purpose, coin, account, change, index] => {
            if coin != expected_coin
                || !is_valid_account(account)
                || change & HARDENED != 0
                || index & HARDENED != 0
            {
                return Err(reject());
            }
            singlesig_from_purpose(purpose).ok_or_else(reject)
        }
        _ => Err(reject()),
    }
}

/// Strict check for a singlesig address path shown on the device
///
/// Requires exactly `purpose/coin'/account'/change/index` with change 0 or 1
/// and index in [0, 9999].
pub fn check_address_path(path: &[u32], expected_purpose: u32, network: Network) -> bool {
    let &[purpose, coin, account, change, address] = path else {
        return false;
    };
    purpose == expected_purpose
        && coin == network.coin_type()
        && is_valid_account(account)
        && change <= 1
        && address <= MAX_ADDRESS_INDEX
}

/// Account component (index 2) of a keypath
pub fn account_of(path: &[u32]) -> Option<u32> {
    path.get(2).copied()
}

/// A change path has 1 as its second to last component
pub fn is_change_path(path: &[u32]) -> bool {
    path.len() >= 2 && path[path.len() - 2] == 1
}

/// Parse a BIP32 path string to its components
/// e.g., "m/84'/0'/0'/0/5" -> [0x80000054, 0x80000000, 0x80000000, 0, 5]
pub fn parse_path(path: &str) -> Result<Vec<u32>> {
    let mut parts = path.split('/');
    if parts.next() != Some("m") {
        return Err(CoreError::InvalidPath(format!(
            "Path must start with 'm': {}",
            path
        )));
    }

    let mut result = Vec::new();
    for part in parts {
        let (num_str, hardened) = match part.strip_suffix('\'').or_else(|| part.strip_suffix('h')) {
            Some(stripped) => (stripped, true),
            None => (part, false),
        };

        let num: u32 = num_str
            .parse()
            .map_err(|_| CoreError::InvalidPath(format!("Invalid path component: {}", part)))?;
        if num & HARDENED != 0 {
            return Err(CoreError::InvalidPath(format!(
                "Path component out of range: {}",
                part
            )));
        }

        result.push(if hardened { num | HARDENED } else { num });
    }

    Ok(result)
}

/// Format components as a path string (e.g., "m/84'/0'/0'/0/5")
pub fn format_path(path: &[u32]) -> String {
    let mut s = String::from("m");
    for component in path {
        s.push('/');
        s.push_str(&(component & !HARDENED).to_string());
        if component & HARDENED != 0 {
            s.push('\'');
        }
    }
    s
}
