//! Device message definitions
//!
//! Protobuf messages exchanged with the signing device. The derive
//! attributes are the schema: field tags, primitive types and nested
//! messages are declared here and encoded recursively by prost.

/// Device rejected the request as malformed
pub const ERR_INVALID_INPUT: u32 = 101;

/// Device failed without a specific reason
pub const ERR_GENERIC: u32 = 103;

/// User declined on the device
pub const ERR_USER_ABORT: u32 = 104;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum BtcCoin {
    Btc = 0,
    Tbtc = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum XpubType {
    Tpub = 0,
    Xpub = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ScriptKind {
    P2wpkhP2sh = 0,
    P2wpkh = 1,
    P2wshMultisig = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum OutputType {
    Unknown = 0,
    P2pkh = 1,
    P2sh = 2,
    P2wpkh = 3,
    P2wsh = 4,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct DeviceInfoRequest {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct DeviceInfoResponse {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub version: String,
    #[prost(bool, tag = "3")]
    pub initialized: bool,
    #[prost(bool, tag = "4")]
    pub unlocked: bool,
    #[prost(bool, tag = "5")]
    pub mnemonic_passphrase_enabled: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RootFingerprintRequest {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RootFingerprintResponse {
    /// Fingerprint of the master key (4 bytes)
    #[prost(bytes = "vec", tag = "1")]
    pub fingerprint: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BtcPubRequest {
    #[prost(enumeration = "BtcCoin", tag = "1")]
    pub coin: i32,
    #[prost(uint32, repeated, tag = "2")]
    pub keypath: Vec<u32>,
    #[prost(enumeration = "XpubType", tag = "3")]
    pub xpub_type: i32,
    #[prost(bool, tag = "4")]
    pub display: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BtcPubResponse {
    #[prost(string, tag = "1")]
    pub xpub: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BtcAddressRequest {
    #[prost(enumeration = "BtcCoin", tag = "1")]
    pub coin: i32,
    #[prost(uint32, repeated, tag = "2")]
    pub keypath: Vec<u32>,
    #[prost(enumeration = "ScriptKind", tag = "3")]
    pub script_kind: i32,
    #[prost(bool, tag = "4")]
    pub display: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BtcAddressResponse {
    #[prost(string, tag = "1")]
    pub address: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ScriptConfigWithKeypath {
    #[prost(enumeration = "ScriptKind", tag = "1")]
    pub script_kind: i32,
    /// Account-level keypath, e.g. m/84'/0'/0'
    #[prost(uint32, repeated, tag = "2")]
    pub keypath: Vec<u32>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PrevTxInput {
    #[prost(bytes = "vec", tag = "1")]
    pub prev_out_hash: Vec<u8>,
    #[prost(uint32, tag = "2")]
    pub prev_out_index: u32,
    #[prost(bytes = "vec", tag = "3")]
    pub signature_script: Vec<u8>,
    #[prost(uint32, tag = "4")]
    pub sequence: u32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PrevTxOutput {
    #[prost(uint64, tag = "1")]
    pub value: u64,
    #[prost(bytes = "vec", tag = "2")]
    pub pubkey_script: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PrevTx {
    #[prost(uint32, tag = "1")]
    pub version: u32,
    #[prost(uint32, tag = "2")]
    pub locktime: u32,
    #[prost(message, repeated, tag = "3")]
    pub inputs: Vec<PrevTxInput>,
    #[prost(message, repeated, tag = "4")]
    pub outputs: Vec<PrevTxOutput>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BtcSignInput {
    /// Previous txid in internal byte order
    #[prost(bytes = "vec", tag = "1")]
    pub prev_out_hash: Vec<u8>,
    #[prost(uint32, tag = "2")]
    pub prev_out_index: u32,
    #[prost(uint64, tag = "3")]
    pub prev_out_value: u64,
    #[prost(uint32, tag = "4")]
    pub sequence: u32,
    #[prost(uint32, repeated, tag = "5")]
    pub keypath: Vec<u32>,
    #[prost(uint32, tag = "6")]
    pub script_config_index: u32,
    #[prost(message, optional, tag = "7")]
    pub prev_tx: Option<PrevTx>,
}

/// Transaction output as seen by the device
///
/// `ours` outputs carry keypath and script config index; external outputs
/// carry the output type and its hash payload.
#[derive(Clone, PartialEq, prost::Message)]
pub struct BtcSignOutput {
    #[prost(bool, tag = "1")]
    pub ours: bool,
    #[prost(enumeration = "OutputType", tag = "2")]
    pub output_type: i32,
    #[prost(uint64, tag = "3")]
    pub value: u64,
    #[prost(bytes = "vec", tag = "4")]
    pub payload: Vec<u8>,
    #[prost(uint32, repeated, tag = "5")]
    pub keypath: Vec<u32>,
    #[prost(uint32, tag = "6")]
    pub script_config_index: u32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BtcSignRequest {
    #[prost(enumeration = "BtcCoin", tag = "1")]
    pub coin: i32,
    #[prost(message, repeated, tag = "2")]
    pub script_configs: Vec<ScriptConfigWithKeypath>,
    #[prost(uint32, tag = "3")]
    pub version: u32,
    #[prost(uint32, tag = "4")]
    pub locktime: u32,
    #[prost(message, repeated, tag = "5")]
    pub inputs: Vec<BtcSignInput>,
    #[prost(message, repeated, tag = "6")]
    pub outputs: Vec<BtcSignOutput>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BtcSignature {
    #[prost(uint32, tag = "1")]
    pub index: u32,
    /// Compact r || s (64 bytes)
    #[prost(bytes = "vec", tag = "2")]
    pub signature: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BtcSignResponse {
    #[prost(message, repeated, tag = "1")]
    pub signatures: Vec<BtcSignature>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Failure {
    #[prost(uint32, tag = "1")]
    pub code: u32,
    #[prost(string, tag = "2")]
    pub message: String,
}
