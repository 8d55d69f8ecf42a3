//! Device driven over the chunked wire protocol
//!
//! Maps each [`DeviceApi`] operation to one request/response exchange on a
//! [`ChunkTransport`]. Device failures come back as a `Failure` message and
//! are mapped to distinct error conditions here.

use tracing::{debug, warn};

use hwlink_core::{Network, ScriptType};
use hwlink_transport::messages::{self, BtcCoin, OutputType, ScriptKind};
use hwlink_transport::{ChunkTransport, DeviceMessage, PhysicalLink};

use crate::device::{DeviceApi, DeviceInfo, XpubType};
use crate::error::{Result, SignerError};
use crate::request::{DeviceSignature, OutputKind, PrevTx, SignOutput, SignRequest};

/// A [`DeviceApi`] speaking the wire protocol over a physical link
pub struct WireDevice<L: PhysicalLink> {
    transport: ChunkTransport<L>,
}

impl<L: PhysicalLink> WireDevice<L> {
    pub fn new(link: L) -> Self {
        Self {
            transport: ChunkTransport::new(link),
        }
    }

    pub fn transport(&self) -> &ChunkTransport<L> {
        &self.transport
    }

    pub fn link(&self) -> &L {
        self.transport.link()
    }

    pub fn link_mut(&mut self) -> &mut L {
        self.transport.link_mut()
    }

    pub fn into_inner(self) -> L {
        self.transport.into_inner()
    }

    /// Send one request and wait for its response
    ///
    /// `operation` names the call in a user-cancelled error.
    fn call(&mut self, operation: &str, request: DeviceMessage) -> Result<DeviceMessage> {
        self.transport.begin_session()?;
        let exchanged = self
            .transport
            .write_message(&request)
            .and_then(|()| self.transport.read_message());
        let ended = self.transport.end_session();
        let response = exchanged?;
        ended?;

        match response {
            DeviceMessage::Failure(failure) => Err(map_failure(operation, failure)),
            response => Ok(response),
        }
    }
}

fn map_failure(operation: &str, failure: messages::Failure) -> SignerError {
    warn!(
        code = failure.code,
        "Device failed {}: {}", operation, failure.message
    );
    match failure.code {
        messages::ERR_USER_ABORT => SignerError::UserCancelled(operation.to_string()),
        messages::ERR_INVALID_INPUT | messages::ERR_GENERIC => {
            SignerError::BadRequest("invalid input".to_string())
        }
        code => SignerError::Device {
            code,
            message: failure.message,
        },
    }
}

fn unexpected(expected: &str, got: &DeviceMessage) -> SignerError {
    SignerError::UnexpectedResponse(format!(
        "expected {}, got {}",
        expected,
        got.message_type()
    ))
}

fn coin(network: Network) -> BtcCoin {
    match network {
        Network::Mainnet => BtcCoin::Btc,
        Network::Testnet => BtcCoin::Tbtc,
    }
}

fn script_kind(script_type: ScriptType) -> ScriptKind {
    match script_type {
        ScriptType::P2wpkhP2sh => ScriptKind::P2wpkhP2sh,
        ScriptType::P2wpkh => ScriptKind::P2wpkh,
        ScriptType::P2wshMultisig => ScriptKind::P2wshMultisig,
    }
}

fn output_type(kind: OutputKind) -> OutputType {
    match kind {
        OutputKind::P2pkh => OutputType::P2pkh,
        OutputKind::P2sh => OutputType::P2sh,
        OutputKind::P2wpkh => OutputType::P2wpkh,
        OutputKind::P2wsh => OutputType::P2wsh,
    }
}

fn encode_prev_tx(prev_tx: &PrevTx) -> messages::PrevTx {
    messages::PrevTx {
        version: prev_tx.version,
        locktime: prev_tx.locktime,
        inputs: prev_tx
            .inputs
            .iter()
            .map(|input| messages::PrevTxInput {
                prev_out_hash: input.prev_out_hash.to_vec(),
                prev_out_index: input.prev_out_index,
                signature_script: input.signature_script.clone(),
                sequence: input.sequence,
            })
            .collect(),
        outputs: prev_tx
            .outputs
            .iter()
            .map(|output| messages::PrevTxOutput {
                value: output.value,
                pubkey_script: output.pubkey_script.clone(),
            })
            .collect(),
    }
}

fn encode_sign_request(request: &SignRequest) -> messages::BtcSignRequest {
    messages::BtcSignRequest {
        coin: coin(request.network) as i32,
        script_configs: request
            .script_configs
            .iter()
            .map(|config| messages::ScriptConfigWithKeypath {
                script_kind: script_kind(config.script_type) as i32,
                keypath: config.keypath.clone(),
            })
            .collect(),
        version: request.version,
        locktime: request.locktime,
        inputs: request
            .inputs
            .iter()
            .map(|input| messages::BtcSignInput {
                prev_out_hash: input.prev_out_hash.to_vec(),
                prev_out_index: input.prev_out_index,
                prev_out_value: input.prev_out_value,
                sequence: input.sequence,
                keypath: input.keypath.clone(),
                script_config_index: input.script_config_index,
                prev_tx: input.prev_tx.as_ref().map(encode_prev_tx),
            })
            .collect(),
        outputs: request
            .outputs
            .iter()
            .map(|output| match output {
                SignOutput::Internal {
                    keypath,
                    value,
                    script_config_index,
                } => messages::BtcSignOutput {
                    ours: true,
                    output_type: OutputType::Unknown as i32,
                    value: *value,
                    payload: Vec::new(),
                    keypath: keypath.clone(),
                    script_config_index: *script_config_index,
                },
                SignOutput::External {
                    kind,
                    payload,
                    value,
                } => messages::BtcSignOutput {
                    ours: false,
                    output_type: output_type(*kind) as i32,
                    value: *value,
                    payload: payload.clone(),
                    keypath: Vec::new(),
                    script_config_index: 0,
                },
            })
            .collect(),
    }
}

impl<L: PhysicalLink> DeviceApi for WireDevice<L> {
    fn device_info(&mut self) -> Result<DeviceInfo> {
        match self.call("device_info", messages::DeviceInfoRequest {}.into())? {
            DeviceMessage::DeviceInfoResponse(info) => Ok(DeviceInfo {
                name: info.name,
                version: info.version,
                initialized: info.initialized,
                unlocked: info.unlocked,
                mnemonic_passphrase_enabled: info.mnemonic_passphrase_enabled,
            }),
            other => Err(unexpected("DeviceInfoResponse", &other)),
        }
    }

    fn root_fingerprint(&mut self) -> Result<[u8; 4]> {
        match self.call("root_fingerprint", messages::RootFingerprintRequest {}.into())? {
            DeviceMessage::RootFingerprintResponse(response) => {
                response.fingerprint.as_slice().try_into().map_err(|_| {
                    SignerError::UnexpectedResponse(format!(
                        "fingerprint of {} bytes",
                        response.fingerprint.len()
                    ))
                })
            }
            other => Err(unexpected("RootFingerprintResponse", &other)),
        }
    }

    fn btc_xpub(
        &mut self,
        network: Network,
        keypath: &[u32],
        xpub_type: XpubType,
        display: bool,
    ) -> Result<String> {
        let xpub_type = match xpub_type {
            XpubType::Xpub => messages::XpubType::Xpub,
            XpubType::Tpub => messages::XpubType::Tpub,
        };
        let request = messages::BtcPubRequest {
            coin: coin(network) as i32,
            keypath: keypath.to_vec(),
            xpub_type: xpub_type as i32,
            display,
        };
        match self.call("get_pubkey_at_path", request.into())? {
            DeviceMessage::BtcPubResponse(response) => Ok(response.xpub),
            other => Err(unexpected("BtcPubResponse", &other)),
        }
    }

    fn btc_address(
        &mut self,
        network: Network,
        keypath: &[u32],
        script_type: ScriptType,
        display: bool,
    ) -> Result<String> {
        let request = messages::BtcAddressRequest {
            coin: coin(network) as i32,
            keypath: keypath.to_vec(),
            script_kind: script_kind(script_type) as i32,
            display,
        };
        match self.call("display_address", request.into())? {
            DeviceMessage::BtcAddressResponse(response) => Ok(response.address),
            other => Err(unexpected("BtcAddressResponse", &other)),
        }
    }

    fn btc_sign(&mut self, request: &SignRequest) -> Result<Vec<DeviceSignature>> {
        debug!(
            inputs = request.inputs.len(),
            outputs = request.outputs.len(),
            script_configs = request.script_configs.len(),
            "Sending signing request"
        );
        let response = match self.call("sign_tx", encode_sign_request(request).into())? {
            DeviceMessage::BtcSignResponse(response) => response,
            other => return Err(unexpected("BtcSignResponse", &other)),
        };

        response
            .signatures
            .into_iter()
            .map(|signature| {
                let bytes: [u8; 64] = signature.signature.as_slice().try_into().map_err(|_| {
                    SignerError::UnexpectedResponse(format!(
                        "signature of {} bytes for input {}",
                        signature.signature.len(),
                        signature.index
                    ))
                })?;
                Ok(DeviceSignature {
                    index: signature.index,
                    signature: bytes,
                })
            })
            .collect()
    }

    fn begin_session(&mut self) -> Result<()> {
        Ok(self.transport.begin_session()?)
    }

    fn end_session(&mut self) -> Result<()> {
        Ok(self.transport.end_session()?)
    }
}
