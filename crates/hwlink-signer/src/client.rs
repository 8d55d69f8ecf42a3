//! Device client
//!
//! High-level operations on one attached device. Each public call runs in
//! its own device session; calls made from inside another operation nest
//! into the outer session and share its connection.

use base64::prelude::*;
use bitcoin::bip32::Fingerprint;
use bitcoin::psbt::Psbt;
use bitcoin::Script;
use tracing::{debug, info};

use hwlink_core::{check_address_path, classify, parse_path, KeypathError, Network, ScriptType};

use crate::config::ClientConfig;
use crate::device::{DeviceApi, XpubType};
use crate::error::{Result, SignerError};
use crate::psbt::PsbtTranslator;

/// Address encoding requested for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    /// P2WPKH nested in P2SH
    WrappedSegwit,
    /// Native segwit v0 (bech32)
    NativeSegwit,
    /// P2PKH
    Legacy,
}

/// Client for one signing device
pub struct DeviceClient<D: DeviceApi> {
    device: D,
    config: ClientConfig,
}

impl<D: DeviceApi> DeviceClient<D> {
    pub fn new(device: D, config: ClientConfig) -> Self {
        Self { device, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn network(&self) -> Network {
        self.config.network
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_inner(self) -> D {
        self.device
    }

    /// Run `f` inside a device session
    ///
    /// The session is ended even when `f` fails; the error of `f` wins.
    fn with_session<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.device.begin_session()?;
        let result = f(self);
        let ended = self.device.end_session();
        let value = result?;
        ended?;
        Ok(value)
    }

    /// Fail unless the device is unlocked and holds a seed
    fn ensure_ready(&mut self) -> Result<()> {
        let info = self.device.device_info()?;
        if !info.unlocked {
            return Err(SignerError::DeviceNotReady(
                self.config.unlock_hint().to_string(),
            ));
        }
        if !info.initialized {
            return Err(SignerError::NotInitialized);
        }
        Ok(())
    }

    fn root_fingerprint(&mut self) -> Result<[u8; 4]> {
        self.with_session(|client| {
            client.ensure_ready()?;
            client.device.root_fingerprint()
        })
    }

    /// Fingerprint of the device's master key
    pub fn get_master_fingerprint(&mut self) -> Result<Fingerprint> {
        self.root_fingerprint().map(Fingerprint::from)
    }

    /// Fingerprint of the device's master key as lowercase hex
    pub fn get_master_fingerprint_hex(&mut self) -> Result<String> {
        Ok(hex::encode(self.root_fingerprint()?))
    }

    /// Export the extended public key of an account
    ///
    /// Only account-level paths are exported: `m/49'|84'/coin'/account'`
    /// and `m/48'/coin'/account'/2'`.
    pub fn get_pubkey_at_path(&mut self, path: &str) -> Result<String> {
        let network = self.network();
        let keypath = parse_path(path)?;
        if !matches!(keypath.len(), 3 | 4) {
            return Err(KeypathError::new(&keypath, network).into());
        }
        let script_type = classify(&keypath, network)?;
        debug!(%script_type, path, "Exporting xpub");

        let xpub_type = XpubType::for_network(network);
        self.with_session(|client| client.device.btc_xpub(network, &keypath, xpub_type, false))
    }

    /// Show the address at `path` on the device and return it
    ///
    /// Multisig addresses (a `redeem_script`) and legacy addresses are not
    /// supported.
    pub fn display_address(
        &mut self,
        path: &str,
        kind: AddressKind,
        redeem_script: Option<&Script>,
    ) -> Result<String> {
        if redeem_script.is_some() {
            return Err(SignerError::Unsupported(
                "multisig address display is not supported".to_string(),
            ));
        }
        let script_type = match kind {
            AddressKind::WrappedSegwit => ScriptType::P2wpkhP2sh,
            AddressKind::NativeSegwit => ScriptType::P2wpkh,
            AddressKind::Legacy => {
                return Err(SignerError::Unsupported(
                    "legacy p2pkh addresses are not supported".to_string(),
                ))
            }
        };

        let network = self.network();
        let keypath = parse_path(path)?;
        if !check_address_path(&keypath, script_type.purpose(), network) {
            return Err(KeypathError::new(&keypath, network).into());
        }

        info!("Please confirm the address on the device");
        self.with_session(|client| {
            client
                .device
                .btc_address(network, &keypath, script_type, true)
        })
    }

    /// Sign every input of `psbt` that the device holds a key for
    ///
    /// Adds partial signatures in place and returns the PSBT in base64.
    /// On error the PSBT is left unmodified.
    pub fn sign_tx(&mut self, psbt: &mut Psbt) -> Result<String> {
        let network = self.network();
        self.with_session(|client| {
            let fingerprint = client.get_master_fingerprint()?;
            let translator = PsbtTranslator::new(fingerprint, network);
            let plan = translator.translate(psbt)?;

            info!(
                inputs = plan.request.inputs.len(),
                outputs = plan.request.outputs.len(),
                "Please confirm the transaction on the device"
            );
            let signatures = client.device.btc_sign(&plan.request)?;
            translator.merge(psbt, &plan, &signatures)?;
            info!(signatures = signatures.len(), "Transaction signed");

            Ok(BASE64_STANDARD.encode(psbt.serialize()))
        })
    }

    /// Sign a base64 encoded PSBT, returning the signed PSBT in base64
    pub fn sign_psbt_base64(&mut self, psbt: &str) -> Result<String> {
        let bytes = BASE64_STANDARD
            .decode(psbt.trim())
            .map_err(|e| SignerError::Psbt(format!("Invalid base64: {}", e)))?;
        let mut psbt = Psbt::deserialize(&bytes)?;
        self.sign_tx(&mut psbt)
    }
}
