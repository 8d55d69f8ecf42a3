//! hwlink Signer - PSBT signing with a hardware device
//!
//! This crate drives a hardware signing device on behalf of a wallet:
//! - `device` - the capability interface a device offers
//! - `wire_device` - that interface over the chunked wire protocol
//! - `psbt` - translation of PSBTs into device signing requests and the
//!   merge of returned signatures
//! - `client` - fingerprint, xpub export, address display and signing
//!
//! # Example
//!
//! ```no_run
//! use hwlink_signer::{ClientConfig, DeviceClient, WireDevice};
//! use hwlink_transport::MemoryLink;
//!
//! let device = WireDevice::new(MemoryLink::new());
//! let mut client = DeviceClient::new(device, ClientConfig::default());
//! let fingerprint = client.get_master_fingerprint_hex()?;
//! println!("{}", fingerprint);
//! # Ok::<(), hwlink_signer::SignerError>(())
//! ```

pub mod client;
pub mod config;
pub mod device;
pub mod error;
pub mod psbt;
pub mod request;
pub mod signature;
pub mod wire_device;


pub use client::{AddressKind, DeviceClient};
pub use config::ClientConfig;
pub use device::{DeviceApi, DeviceInfo, XpubType};
pub use error::{Result, SignerError};
pub use psbt::{PsbtTranslator, SigningPlan};
pub use request::{
    DeviceSignature, OutputKind, PrevTx, PrevTxInput, PrevTxOutput, ScriptConfig, SignInput,
    SignOutput, SignRequest,
};
pub use wire_device::WireDevice;
