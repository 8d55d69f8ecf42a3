//! Simulated signing device and PSBT fixtures for end-to-end tests
//!
//! The simulated device sits behind the physical link: it receives raw
//! reports, reassembles and decodes requests, derives keys from a BIP32 seed
//! and answers in reports, just like hardware on a USB HID link.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::io;

use bitcoin::absolute::LockTime;
use bitcoin::bip32::{ChildNumber, DerivationPath, Fingerprint, Xpriv, Xpub};
use bitcoin::hashes::{hash160, Hash};
use bitcoin::psbt::Psbt;
use bitcoin::secp256k1::{self, All, Message, Secp256k1};
use bitcoin::sighash::SighashCache;
use bitcoin::transaction::Version;
use bitcoin::{
    Amount, EcdsaSighashType, NetworkKind, OutPoint, ScriptBuf, Sequence, Transaction, TxIn,
    TxOut, Txid, Witness,
};

use hwlink_core::{Network, ScriptType, HARDENED};
use hwlink_transport::messages::{self, BtcCoin, OutputType, ScriptKind};
use hwlink_transport::{ChunkTransport, DeviceMessage, MemoryLink, PhysicalLink};

pub const SEED: [u8; 32] = [0x5e; 32];

/// Install a test subscriber honouring `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn to_derivation_path(keypath: &[u32]) -> DerivationPath {
    DerivationPath::from(
        keypath
            .iter()
            .map(|&component| ChildNumber::from(component))
            .collect::<Vec<_>>(),
    )
}

pub fn hash160(bytes: &[u8]) -> [u8; 20] {
    hash160::Hash::hash(bytes).to_byte_array()
}

/// Native segwit v0 key hash program
pub fn p2wpkh_script(key: &secp256k1::PublicKey) -> ScriptBuf {
    let mut bytes = vec![0x00, 0x14];
    bytes.extend_from_slice(&hash160(&key.serialize()));
    ScriptBuf::from_bytes(bytes)
}

pub fn p2sh_script(script_hash: &[u8]) -> ScriptBuf {
    let mut bytes = vec![0xa9, 0x14];
    bytes.extend_from_slice(script_hash);
    bytes.push(0x87);
    ScriptBuf::from_bytes(bytes)
}

pub fn p2pkh_script(key_hash: &[u8]) -> ScriptBuf {
    let mut bytes = vec![0x76, 0xa9, 0x14];
    bytes.extend_from_slice(key_hash);
    bytes.extend_from_slice(&[0x88, 0xac]);
    ScriptBuf::from_bytes(bytes)
}

pub fn p2wsh_script(script_hash: &[u8]) -> ScriptBuf {
    let mut bytes = vec![0x00, 0x20];
    bytes.extend_from_slice(script_hash);
    ScriptBuf::from_bytes(bytes)
}

/// Output script paying to `key` and its redeem script, if wrapped
pub fn singlesig_script(
    script_type: ScriptType,
    key: &secp256k1::PublicKey,
) -> (ScriptBuf, Option<ScriptBuf>) {
    let program = p2wpkh_script(key);
    match script_type {
        ScriptType::P2wpkh => (program, None),
        ScriptType::P2wpkhP2sh => (p2sh_script(&hash160(program.as_bytes())), Some(program)),
        ScriptType::P2wshMultisig => panic!("multisig scripts are not simulated"),
    }
}

fn bitcoin_network(network: Network) -> bitcoin::Network {
    match network {
        Network::Mainnet => bitcoin::Network::Bitcoin,
        Network::Testnet => bitcoin::Network::Testnet,
    }
}

/// BIP32 wallet derived from [`SEED`], shared by the device and the host
/// side of a test
pub struct Keychain {
    secp: Secp256k1<All>,
    master: Xpriv,
}

impl Keychain {
    pub fn new() -> Self {
        let secp = Secp256k1::new();
        let master = Xpriv::new_master(bitcoin::Network::Bitcoin, &SEED).unwrap();
        Self { secp, master }
    }

    pub fn secp(&self) -> &Secp256k1<All> {
        &self.secp
    }

    /// Fingerprint computed from the master public key
    pub fn fingerprint_bytes(&self) -> [u8; 4] {
        let master_pub = secp256k1::PublicKey::from_secret_key(&self.secp, &self.master.private_key);
        let hash = hash160(&master_pub.serialize());
        [hash[0], hash[1], hash[2], hash[3]]
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.master.fingerprint(&self.secp)
    }

    pub fn derive(&self, keypath: &[u32]) -> Xpriv {
        self.master
            .derive_priv(&self.secp, &to_derivation_path(keypath))
            .unwrap()
    }

    pub fn public_key(&self, keypath: &[u32]) -> secp256k1::PublicKey {
        secp256k1::PublicKey::from_secret_key(&self.secp, &self.derive(keypath).private_key)
    }

    pub fn xpub(&self, keypath: &[u32], kind: NetworkKind) -> String {
        let mut xpriv = self.derive(keypath);
        xpriv.network = kind;
        Xpub::from_priv(&self.secp, &xpriv).to_string()
    }

    pub fn address(&self, keypath: &[u32], script_type: ScriptType, network: Network) -> String {
        let (script, _) = singlesig_script(script_type, &self.public_key(keypath));
        bitcoin::Address::from_script(&script, bitcoin_network(network))
            .unwrap()
            .to_string()
    }
}

impl Default for Keychain {
    fn default() -> Self {
        Self::new()
    }
}

/// A signing device reachable only through its physical link
pub struct SimulatedDevice {
    keychain: Keychain,
    pub initialized: bool,
    pub unlocked: bool,
    /// Answer the next signing request as if the user declined
    pub decline_signing: bool,
    connected: bool,
    pub opens: usize,
    pub closes: usize,
    inbound: Vec<Vec<u8>>,
    outbound: VecDeque<Vec<u8>>,
    /// Every request decoded so far
    pub requests: Vec<DeviceMessage>,
}

impl SimulatedDevice {
    pub fn new() -> Self {
        Self {
            keychain: Keychain::new(),
            initialized: true,
            unlocked: true,
            decline_signing: false,
            connected: false,
            opens: 0,
            closes: 0,
            inbound: Vec::new(),
            outbound: VecDeque::new(),
            requests: Vec::new(),
        }
    }

    pub fn keychain(&self) -> &Keychain {
        &self.keychain
    }

    pub fn sign_requests(&self) -> Vec<&messages::BtcSignRequest> {
        self.requests
            .iter()
            .filter_map(|request| match request {
                DeviceMessage::BtcSignRequest(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    /// Whether the reports received so far make up one whole request
    fn request_complete(&self) -> bool {
        let Some(first) = self.inbound.first() else {
            return false;
        };
        match hwlink_transport::frame::parse_first_chunk(first) {
            Ok((_, length, _)) => {
                match hwlink_transport::frame::chunk_count(length as usize, first.len()) {
                    Ok(needed) => self.inbound.len() >= needed,
                    Err(_) => true,
                }
            }
            // Let the reassembly report the framing error
            Err(_) => true,
        }
    }

    fn process_request(&mut self) {
        let mut link = MemoryLink::new();
        link.queue_reads(std::mem::take(&mut self.inbound));
        let response = match ChunkTransport::new(link).read_message() {
            Ok(request) => {
                let response = self.handle(&request);
                self.requests.push(request);
                response
            }
            Err(e) => failure(messages::ERR_INVALID_INPUT, &e.to_string()),
        };

        let mut transport = ChunkTransport::new(MemoryLink::new());
        if transport.write_message(&response).is_ok() {
            self.outbound.extend(transport.into_inner().take_written());
        }
    }

    fn handle(&mut self, request: &DeviceMessage) -> DeviceMessage {
        match request {
            DeviceMessage::DeviceInfoRequest(_) => messages::DeviceInfoResponse {
                name: "simulated".to_string(),
                version: "9.20.0".to_string(),
                initialized: self.initialized,
                unlocked: self.unlocked,
                mnemonic_passphrase_enabled: false,
            }
            .into(),
            DeviceMessage::RootFingerprintRequest(_) => messages::RootFingerprintResponse {
                fingerprint: self.keychain.fingerprint_bytes().to_vec(),
            }
            .into(),
            DeviceMessage::BtcPubRequest(request) => {
                let kind = if request.xpub_type == messages::XpubType::Tpub as i32 {
                    NetworkKind::Test
                } else {
                    NetworkKind::Main
                };
                messages::BtcPubResponse {
                    xpub: self.keychain.xpub(&request.keypath, kind),
                }
                .into()
            }
            DeviceMessage::BtcAddressRequest(request) => {
                let script_type = match ScriptKind::try_from(request.script_kind) {
                    Ok(ScriptKind::P2wpkh) => ScriptType::P2wpkh,
                    Ok(ScriptKind::P2wpkhP2sh) => ScriptType::P2wpkhP2sh,
                    _ => return failure(messages::ERR_INVALID_INPUT, "script kind"),
                };
                messages::BtcAddressResponse {
                    address: self.keychain.address(
                        &request.keypath,
                        script_type,
                        network_of(request.coin),
                    ),
                }
                .into()
            }
            DeviceMessage::BtcSignRequest(request) => {
                if std::mem::take(&mut self.decline_signing) {
                    return failure(messages::ERR_USER_ABORT, "user abort");
                }
                match self.sign(request) {
                    Ok(response) => response.into(),
                    Err(reason) => failure(messages::ERR_INVALID_INPUT, &reason),
                }
            }
            _ => failure(messages::ERR_INVALID_INPUT, "unexpected message"),
        }
    }

    fn script_type(request: &messages::BtcSignRequest, index: u32) -> Result<ScriptType, String> {
        let config = request
            .script_configs
            .get(index as usize)
            .ok_or("script config index")?;
        match ScriptKind::try_from(config.script_kind) {
            Ok(ScriptKind::P2wpkh) => Ok(ScriptType::P2wpkh),
            Ok(ScriptKind::P2wpkhP2sh) => Ok(ScriptType::P2wpkhP2sh),
            _ => Err("script kind".to_string()),
        }
    }

    /// Rebuild the transaction from the request and sign every input
    fn sign(&self, request: &messages::BtcSignRequest) -> Result<messages::BtcSignResponse, String> {
        let mut tx_inputs = Vec::new();
        for input in &request.inputs {
            let hash: [u8; 32] = input
                .prev_out_hash
                .as_slice()
                .try_into()
                .map_err(|_| "prev out hash")?;
            if let Some(prev_tx) = &input.prev_tx {
                if rebuild_prev_tx(prev_tx)?.compute_txid().to_byte_array() != hash {
                    return Err("previous transaction hash".to_string());
                }
            }
            tx_inputs.push(TxIn {
                previous_output: OutPoint {
                    txid: Txid::from_byte_array(hash),
                    vout: input.prev_out_index,
                },
                script_sig: ScriptBuf::new(),
                sequence: Sequence(input.sequence),
                witness: Witness::new(),
            });
        }

        let mut tx_outputs = Vec::new();
        for output in &request.outputs {
            let script_pubkey = if output.ours {
                let script_type = Self::script_type(request, output.script_config_index)?;
                singlesig_script(script_type, &self.keychain.public_key(&output.keypath)).0
            } else {
                match OutputType::try_from(output.output_type) {
                    Ok(OutputType::P2pkh) => p2pkh_script(&output.payload),
                    Ok(OutputType::P2sh) => p2sh_script(&output.payload),
                    Ok(OutputType::P2wpkh) => {
                        let mut bytes = vec![0x00, 0x14];
                        bytes.extend_from_slice(&output.payload);
                        ScriptBuf::from_bytes(bytes)
                    }
                    Ok(OutputType::P2wsh) => p2wsh_script(&output.payload),
                    _ => return Err("output type".to_string()),
                }
            };
            tx_outputs.push(TxOut {
                value: Amount::from_sat(output.value),
                script_pubkey,
            });
        }

        let tx = Transaction {
            version: Version(request.version as i32),
            lock_time: LockTime::from_consensus(request.locktime),
            input: tx_inputs,
            output: tx_outputs,
        };

        let mut cache = SighashCache::new(&tx);
        let mut signatures = Vec::new();
        for (index, input) in request.inputs.iter().enumerate() {
            Self::script_type(request, input.script_config_index)?;
            let secret = self.keychain.derive(&input.keypath).private_key;
            let key = secp256k1::PublicKey::from_secret_key(self.keychain.secp(), &secret);
            let sighash = cache
                .p2wpkh_signature_hash(
                    index,
                    &p2wpkh_script(&key),
                    Amount::from_sat(input.prev_out_value),
                    EcdsaSighashType::All,
                )
                .map_err(|e| e.to_string())?;
            let signature = self
                .keychain
                .secp()
                .sign_ecdsa(&Message::from_digest(sighash.to_byte_array()), &secret);
            signatures.push(messages::BtcSignature {
                index: index as u32,
                signature: signature.serialize_compact().to_vec(),
            });
        }
        Ok(messages::BtcSignResponse { signatures })
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

fn failure(code: u32, message: &str) -> DeviceMessage {
    messages::Failure {
        code,
        message: message.to_string(),
    }
    .into()
}

fn network_of(coin: i32) -> Network {
    if coin == BtcCoin::Tbtc as i32 {
        Network::Testnet
    } else {
        Network::Mainnet
    }
}

fn rebuild_prev_tx(prev_tx: &messages::PrevTx) -> Result<Transaction, String> {
    let input = prev_tx
        .inputs
        .iter()
        .map(|input| {
            let hash: [u8; 32] = input
                .prev_out_hash
                .as_slice()
                .try_into()
                .map_err(|_| "prev tx input hash".to_string())?;
            Ok(TxIn {
                previous_output: OutPoint {
                    txid: Txid::from_byte_array(hash),
                    vout: input.prev_out_index,
                },
                script_sig: ScriptBuf::from_bytes(input.signature_script.clone()),
                sequence: Sequence(input.sequence),
                witness: Witness::new(),
            })
        })
        .collect::<Result<Vec<_>, String>>()?;
    let output = prev_tx
        .outputs
        .iter()
        .map(|output| TxOut {
            value: Amount::from_sat(output.value),
            script_pubkey: ScriptBuf::from_bytes(output.pubkey_script.clone()),
        })
        .collect();
    Ok(Transaction {
        version: Version(prev_tx.version as i32),
        lock_time: LockTime::from_consensus(prev_tx.locktime),
        input,
        output,
    })
}

impl PhysicalLink for SimulatedDevice {
    fn open(&mut self) -> io::Result<()> {
        if self.connected {
            return Err(io::Error::new(io::ErrorKind::AlreadyExists, "already open"));
        }
        self.connected = true;
        self.opens += 1;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        if !self.connected {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "not open"));
        }
        self.connected = false;
        self.closes += 1;
        self.inbound.clear();
        self.outbound.clear();
        Ok(())
    }

    fn read_chunk(&mut self) -> io::Result<Vec<u8>> {
        if !self.connected {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "not open"));
        }
        self.outbound
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::WouldBlock, "no response pending"))
    }

    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        if !self.connected {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "not open"));
        }
        if chunk.len() != self.report_len() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "short report"));
        }
        self.inbound.push(chunk.to_vec());
        if self.request_complete() {
            self.process_request();
        }
        Ok(())
    }
}

/// Spend or change entry of a [`PsbtFixture`]
struct OwnedScript {
    script_type: ScriptType,
    keypath: Vec<u32>,
}

/// Builds PSBTs the way a watch-only wallet holding the device's xpubs would
pub struct PsbtFixture<'a> {
    keychain: &'a Keychain,
    spends: Vec<(OwnedScript, u64)>,
    outputs: Vec<(TxOut, Option<OwnedScript>)>,
    full_prev_tx: bool,
}

impl<'a> PsbtFixture<'a> {
    pub fn new(keychain: &'a Keychain) -> Self {
        Self {
            keychain,
            spends: Vec::new(),
            outputs: Vec::new(),
            full_prev_tx: true,
        }
    }

    pub fn spend(mut self, script_type: ScriptType, keypath: Vec<u32>, value: u64) -> Self {
        self.spends.push((
            OwnedScript {
                script_type,
                keypath,
            },
            value,
        ));
        self
    }

    pub fn pay_to(mut self, script_pubkey: ScriptBuf, value: u64) -> Self {
        self.outputs.push((
            TxOut {
                value: Amount::from_sat(value),
                script_pubkey,
            },
            None,
        ));
        self
    }

    pub fn change(mut self, script_type: ScriptType, keypath: Vec<u32>, value: u64) -> Self {
        let (script_pubkey, _) = singlesig_script(script_type, &self.keychain.public_key(&keypath));
        self.outputs.push((
            TxOut {
                value: Amount::from_sat(value),
                script_pubkey,
            },
            Some(OwnedScript {
                script_type,
                keypath,
            }),
        ));
        self
    }

    /// Supply only the spent outputs, not the full previous transactions
    pub fn witness_utxos_only(mut self) -> Self {
        self.full_prev_tx = false;
        self
    }

    pub fn build(self) -> Psbt {
        let fingerprint = self.keychain.fingerprint();

        let mut prev_txs = Vec::new();
        for (position, (owned, value)) in self.spends.iter().enumerate() {
            let key = self.keychain.public_key(&owned.keypath);
            let (script_pubkey, redeem) = singlesig_script(owned.script_type, &key);
            let prev_tx = Transaction {
                version: Version::TWO,
                lock_time: LockTime::ZERO,
                input: vec![TxIn {
                    previous_output: OutPoint {
                        txid: Txid::from_byte_array([0xa0 + position as u8; 32]),
                        vout: 1,
                    },
                    script_sig: ScriptBuf::new(),
                    sequence: Sequence::MAX,
                    witness: Witness::new(),
                }],
                output: vec![
                    TxOut {
                        value: Amount::from_sat(1_000),
                        script_pubkey: p2wsh_script(&[0x77; 32]),
                    },
                    TxOut {
                        value: Amount::from_sat(*value),
                        script_pubkey,
                    },
                ],
            };
            prev_txs.push((prev_tx, key, redeem));
        }

        let unsigned_tx = Transaction {
            version: Version::TWO,
            lock_time: LockTime::from_consensus(850_000),
            input: prev_txs
                .iter()
                .map(|(prev_tx, _, _)| TxIn {
                    previous_output: OutPoint {
                        txid: prev_tx.compute_txid(),
                        vout: 1,
                    },
                    script_sig: ScriptBuf::new(),
                    sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
                    witness: Witness::new(),
                })
                .collect(),
            output: self.outputs.iter().map(|(txout, _)| txout.clone()).collect(),
        };
        let mut psbt = Psbt::from_unsigned_tx(unsigned_tx).unwrap();

        for ((input, (owned, _)), (prev_tx, key, redeem)) in psbt
            .inputs
            .iter_mut()
            .zip(&self.spends)
            .zip(prev_txs)
        {
            input.bip32_derivation =
                BTreeMap::from([(key, (fingerprint, to_derivation_path(&owned.keypath)))]);
            input.redeem_script = redeem;
            if self.full_prev_tx {
                input.non_witness_utxo = Some(prev_tx);
            } else {
                input.witness_utxo = Some(prev_tx.output[1].clone());
            }
        }

        for (output, (_, owned)) in psbt.outputs.iter_mut().zip(&self.outputs) {
            if let Some(owned) = owned {
                let key = self.keychain.public_key(&owned.keypath);
                let (_, redeem) = singlesig_script(owned.script_type, &key);
                output.bip32_derivation =
                    BTreeMap::from([(key, (fingerprint, to_derivation_path(&owned.keypath)))]);
                output.redeem_script = redeem;
            }
        }
        psbt
    }
}

/// Segwit v0 sighash of an input spending a key owned by `keychain`
pub fn input_sighash(psbt: &Psbt, index: usize, key: &secp256k1::PublicKey) -> Message {
    let value = match (&psbt.inputs[index].non_witness_utxo, &psbt.inputs[index].witness_utxo) {
        (Some(prev_tx), _) => {
            prev_tx.output[psbt.unsigned_tx.input[index].previous_output.vout as usize].value
        }
        (None, Some(utxo)) => utxo.value,
        (None, None) => panic!("input {} has no previous output", index),
    };
    let mut cache = SighashCache::new(&psbt.unsigned_tx);
    let sighash = cache
        .p2wpkh_signature_hash(index, &p2wpkh_script(key), value, EcdsaSighashType::All)
        .unwrap();
    Message::from_digest(sighash.to_byte_array())
}

/// Hardened helper for keypaths written as literals
pub const fn h(index: u32) -> u32 {
    index | HARDENED
}
