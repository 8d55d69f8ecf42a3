//! Device capability interface
//!
//! One method per logical operation a signing device offers. The wire
//! encoding lives behind the trait, so the client and the PSBT translator
//! never see vendor message shapes.

use hwlink_core::{Network, ScriptType};

use crate::error::Result;
use crate::request::{DeviceSignature, SignRequest};

/// Status reported by a connected device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Device name set by the user
    pub name: String,
    /// Firmware version
    pub version: String,
    /// Whether a seed is present
    pub initialized: bool,
    /// Whether the device is unlocked and paired with this host
    pub unlocked: bool,
    pub mnemonic_passphrase_enabled: bool,
}

/// Extended public key serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XpubType {
    Xpub,
    Tpub,
}

impl XpubType {
    pub fn for_network(network: Network) -> Self {
        if network.is_testnet() {
            XpubType::Tpub
        } else {
            XpubType::Xpub
        }
    }
}

/// Operations of a hardware signing device
///
/// Calls block until the device answers, which may include waiting for the
/// user to confirm on the device.
pub trait DeviceApi {
    /// Query device status
    fn device_info(&mut self) -> Result<DeviceInfo>;

    /// Fingerprint of the master key
    fn root_fingerprint(&mut self) -> Result<[u8; 4]>;

    /// Export the extended public key at `keypath`
    fn btc_xpub(
        &mut self,
        network: Network,
        keypath: &[u32],
        xpub_type: XpubType,
        display: bool,
    ) -> Result<String>;

    /// Derive the address at `keypath`, optionally showing it on the device
    fn btc_address(
        &mut self,
        network: Network,
        keypath: &[u32],
        script_type: ScriptType,
        display: bool,
    ) -> Result<String>;

    /// Sign every input of a transaction
    fn btc_sign(&mut self, request: &SignRequest) -> Result<Vec<DeviceSignature>>;

    /// Begin a session; nested sessions share one connection
    fn begin_session(&mut self) -> Result<()> {
        Ok(())
    }

    /// End a session opened with [`DeviceApi::begin_session`]
    fn end_session(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<D: DeviceApi + ?Sized> DeviceApi for Box<D> {
    fn device_info(&mut self) -> Result<DeviceInfo> {
        (**self).device_info()
    }

    fn root_fingerprint(&mut self) -> Result<[u8; 4]> {
        (**self).root_fingerprint()
    }

    fn btc_xpub(
        &mut self,
        network: Network,
        keypath: &[u32],
        xpub_type: XpubType,
        display: bool,
    ) -> Result<String> {
        (**self).btc_xpub(network, keypath, xpub_type, display)
    }

    fn btc_address(
        &mut self,
        network: Network,
        keypath: &[u32],
        script_type: ScriptType,
        display: bool,
    ) -> Result<String> {
        (**self).btc_address(network, keypath, script_type, display)
    }

    fn btc_sign(&mut self, request: &SignRequest) -> Result<Vec<DeviceSignature>> {
        (**self).btc_sign(request)
    }

    fn begin_session(&mut self) -> Result<()> {
        (**self).begin_session()
    }

    fn end_session(&mut self) -> Result<()> {
        (**self).end_session()
    }
}
