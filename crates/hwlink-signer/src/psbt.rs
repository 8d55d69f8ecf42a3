//! PSBT translation
//!
//! Turns a PSBT into the device-native [`SignRequest`] and folds the
//! returned signatures back in. Translation validates every assumption the
//! device signs under and fails on the first violation, before anything
//! is sent:
//!
//! 1. resolve the spent output of each input (full previous transaction,
//!    else the witness UTXO record)
//! 2. find the signer key by master fingerprint
//! 3. classify the input script (P2WPKH, P2WPKH in P2SH)
//! 4. require one account across all inputs
//! 5. describe outputs as change (keypath) or external (type + hash)

use std::collections::BTreeMap;

use bitcoin::bip32::{DerivationPath, Fingerprint, KeySource};
use bitcoin::hashes::Hash;
use bitcoin::psbt::{self, Psbt};
use bitcoin::{secp256k1, Script, Transaction, TxIn, TxOut};
use tracing::debug;

use hwlink_core::keypath::{account_of, is_change_path};
use hwlink_core::{check_address_path, KeypathError, Network, ScriptType};

use crate::error::{Result, SignerError};
use crate::request::{
    DeviceSignature, OutputKind, PrevTx, PrevTxInput, PrevTxOutput, ScriptConfig, SignInput,
    SignOutput, SignRequest,
};
use crate::signature;

/// Raw value of SIGHASH_ALL
const SIGHASH_ALL: u32 = 1;

/// A translated PSBT ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningPlan {
    pub request: SignRequest,
    /// Key each input is signed with, in input order
    pub signer_keys: Vec<bitcoin::PublicKey>,
}

/// Translates PSBTs for one device
#[derive(Debug, Clone, Copy)]
pub struct PsbtTranslator {
    fingerprint: Fingerprint,
    network: Network,
}

/// Script descriptors in order of first use
struct ScriptConfigs {
    network: Network,
    configs: Vec<ScriptConfig>,
}

impl ScriptConfigs {
    fn new(network: Network) -> Self {
        Self {
            network,
            configs: Vec::new(),
        }
    }

    fn index_of(&mut self, script_type: ScriptType, account: u32) -> u32 {
        let position = match self
            .configs
            .iter()
            .position(|config| config.script_type == script_type)
        {
            Some(position) => position,
            None => {
                self.configs.push(ScriptConfig {
                    script_type,
                    keypath: script_type.account_keypath(self.network, account),
                });
                self.configs.len() - 1
            }
        };
        position as u32
    }
}

fn keypath_components(path: &DerivationPath) -> Vec<u32> {
    path.into_iter().map(|child| u32::from(*child)).collect()
}

/// Single-key script type of a spent or paid-to script
///
/// A P2SH script counts as wrapped segwit only when its redeem script is
/// P2WPKH.
fn singlesig_script_type(script: &Script, redeem_script: Option<&Script>) -> Option<ScriptType> {
    if script.is_p2wpkh() {
        return Some(ScriptType::P2wpkh);
    }
    if script.is_p2sh() && redeem_script.is_some_and(Script::is_p2wpkh) {
        return Some(ScriptType::P2wpkhP2sh);
    }
    None
}

fn input_script_type(
    input: usize,
    script: &Script,
    redeem_script: Option<&Script>,
) -> Result<ScriptType> {
    if script.is_p2pkh() {
        return Err(SignerError::UnsupportedScript(
            "legacy p2pkh scripts are not supported".to_string(),
        ));
    }
    if script.is_p2wsh() {
        return Err(SignerError::UnsupportedScript(format!(
            "multisig p2wsh input {} is not supported",
            input
        )));
    }
    singlesig_script_type(script, redeem_script).ok_or_else(|| {
        SignerError::UnsupportedScript(format!("Input script type not recognized of input {}", input))
    })
}

/// External output type and the hash the device pays to
fn external_output(output: usize, script: &Script) -> Result<(OutputKind, Vec<u8>)> {
    let bytes = script.as_bytes();
    let (kind, payload) = if script.is_p2pkh() {
        (OutputKind::P2pkh, &bytes[3..23])
    } else if script.is_p2wpkh() {
        (OutputKind::P2wpkh, &bytes[2..])
    } else if script.is_p2sh() {
        (OutputKind::P2sh, &bytes[2..22])
    } else if script.is_p2wsh() {
        (OutputKind::P2wsh, &bytes[2..])
    } else {
        return Err(SignerError::UnrecognizedOutput { output });
    };
    Ok((kind, payload.to_vec()))
}

fn prev_tx_record(tx: &Transaction) -> PrevTx {
    PrevTx {
        version: tx.version.0 as u32,
        locktime: tx.lock_time.to_consensus_u32(),
        inputs: tx
            .input
            .iter()
            .map(|input| PrevTxInput {
                prev_out_hash: input.previous_output.txid.to_byte_array(),
                prev_out_index: input.previous_output.vout,
                signature_script: input.script_sig.to_bytes(),
                sequence: input.sequence.0,
            })
            .collect(),
        outputs: tx
            .output
            .iter()
            .map(|output| PrevTxOutput {
                value: output.value.to_sat(),
                pubkey_script: output.script_pubkey.to_bytes(),
            })
            .collect(),
    }
}

/// Spent output of an input, and the full previous transaction if supplied
fn resolve_previous_output<'a>(
    index: usize,
    psbt_input: &'a psbt::Input,
    tx_input: &TxIn,
) -> Result<(&'a TxOut, Option<&'a Transaction>)> {
    if let Some(prev_tx) = &psbt_input.non_witness_utxo {
        if prev_tx.compute_txid() != tx_input.previous_output.txid {
            return Err(SignerError::PrevTxHashMismatch { input: index });
        }
        let vout = tx_input.previous_output.vout;
        let utxo = prev_tx
            .output
            .get(vout as usize)
            .ok_or(SignerError::PrevOutIndexOutOfRange {
                input: index,
                index: vout,
            })?;
        return Ok((utxo, Some(prev_tx)));
    }
    psbt_input
        .witness_utxo
        .as_ref()
        .map(|utxo| (utxo, None))
        .ok_or(SignerError::MissingPreviousOutput { input: index })
}

impl PsbtTranslator {
    pub fn new(fingerprint: Fingerprint, network: Network) -> Self {
        Self {
            fingerprint,
            network,
        }
    }

    /// First key whose origin is this device, in map order
    ///
    /// A fingerprint collision between two keys is not disambiguated.
    fn find_signer_key(
        &self,
        keys: &BTreeMap<secp256k1::PublicKey, KeySource>,
    ) -> Option<(secp256k1::PublicKey, Vec<u32>)> {
        keys.iter()
            .find(|(_, (fingerprint, _))| *fingerprint == self.fingerprint)
            .map(|(key, (_, path))| (*key, keypath_components(path)))
    }

    fn check_keypath(&self, keypath: &[u32], script_type: ScriptType) -> Result<()> {
        if !check_address_path(keypath, script_type.purpose(), self.network) {
            return Err(KeypathError::new(keypath, self.network).into());
        }
        Ok(())
    }

    /// Build the signing request for a PSBT
    pub fn translate(&self, psbt: &Psbt) -> Result<SigningPlan> {
        let tx = &psbt.unsigned_tx;
        if tx.input.is_empty() {
            return Err(SignerError::NoInputs);
        }
        if psbt.inputs.len() != tx.input.len() || psbt.outputs.len() != tx.output.len() {
            return Err(SignerError::Psbt(format!(
                "{} inputs and {} outputs in the PSBT for a transaction with {} and {}",
                psbt.inputs.len(),
                psbt.outputs.len(),
                tx.input.len(),
                tx.output.len()
            )));
        }

        let mut configs = ScriptConfigs::new(self.network);
        let mut account = None;
        let mut inputs = Vec::with_capacity(tx.input.len());
        let mut signer_keys = Vec::with_capacity(tx.input.len());

        for (index, (psbt_input, tx_input)) in psbt.inputs.iter().zip(&tx.input).enumerate() {
            if let Some(sighash) = psbt_input.sighash_type {
                if sighash.to_u32() != SIGHASH_ALL {
                    return Err(SignerError::UnsupportedSighash {
                        input: index,
                        sighash: sighash.to_u32(),
                    });
                }
            }

            let (utxo, prev_tx) = resolve_previous_output(index, psbt_input, tx_input)?;

            let (key, keypath) = self
                .find_signer_key(&psbt_input.bip32_derivation)
                .ok_or(SignerError::NoSignerKey { input: index })?;

            let script_type = input_script_type(
                index,
                &utxo.script_pubkey,
                psbt_input.redeem_script.as_deref(),
            )?;
            self.check_keypath(&keypath, script_type)?;

            let input_account = account_of(&keypath).ok_or_else(|| {
                SignerError::from(KeypathError::new(&keypath, self.network))
            })?;
            match account {
                None => account = Some(input_account),
                Some(expected) if expected != input_account => {
                    return Err(SignerError::MixedAccounts)
                }
                Some(_) => {}
            }

            debug!(
                input = index,
                %script_type,
                keypath = %hwlink_core::format_path(&keypath),
                full_prev_tx = prev_tx.is_some(),
                "Classified input"
            );

            inputs.push(SignInput {
                prev_out_hash: tx_input.previous_output.txid.to_byte_array(),
                prev_out_index: tx_input.previous_output.vout,
                prev_out_value: utxo.value.to_sat(),
                sequence: tx_input.sequence.0,
                script_config_index: configs.index_of(script_type, input_account),
                keypath,
                prev_tx: prev_tx.map(prev_tx_record),
            });
            signer_keys.push(bitcoin::PublicKey::new(key));
        }

        // At least one input was processed
        let account = account.ok_or(SignerError::NoInputs)?;

        let mut outputs = Vec::with_capacity(tx.output.len());
        for (index, (psbt_output, tx_output)) in psbt.outputs.iter().zip(&tx.output).enumerate() {
            let change = self
                .find_signer_key(&psbt_output.bip32_derivation)
                .map(|(_, keypath)| keypath)
                .filter(|keypath| is_change_path(keypath) && account_of(keypath) == Some(account));

            let output = match change {
                Some(keypath) => {
                    let script_type = singlesig_script_type(
                        &tx_output.script_pubkey,
                        psbt_output.redeem_script.as_deref(),
                    )
                    .ok_or_else(|| {
                        SignerError::UnsupportedScript(format!(
                            "Change script type not recognized of output {}",
                            index
                        ))
                    })?;
                    self.check_keypath(&keypath, script_type)?;
                    SignOutput::Internal {
                        script_config_index: configs.index_of(script_type, account),
                        keypath,
                        value: tx_output.value.to_sat(),
                    }
                }
                None => {
                    let (kind, payload) = external_output(index, &tx_output.script_pubkey)?;
                    SignOutput::External {
                        kind,
                        payload,
                        value: tx_output.value.to_sat(),
                    }
                }
            };
            debug!(output = index, change = output.is_change(), "Classified output");
            outputs.push(output);
        }

        Ok(SigningPlan {
            request: SignRequest {
                network: self.network,
                script_configs: configs.configs,
                version: tx.version.0 as u32,
                locktime: tx.lock_time.to_consensus_u32(),
                inputs,
                outputs,
            },
            signer_keys,
        })
    }

    /// Insert device signatures into the PSBT as partial signatures
    ///
    /// Every signature is converted before any is inserted, so a bad
    /// response leaves the PSBT untouched.
    pub fn merge(
        &self,
        psbt: &mut Psbt,
        plan: &SigningPlan,
        signatures: &[DeviceSignature],
    ) -> Result<()> {
        if signatures.len() != plan.signer_keys.len() || psbt.inputs.len() != plan.signer_keys.len()
        {
            return Err(SignerError::UnexpectedResponse(format!(
                "{} signatures for {} inputs",
                signatures.len(),
                psbt.inputs.len()
            )));
        }

        let mut partial_sigs = Vec::with_capacity(signatures.len());
        for (position, signature) in signatures.iter().enumerate() {
            if signature.index as usize != position {
                return Err(SignerError::UnexpectedResponse(format!(
                    "signature for input {} at position {}",
                    signature.index, position
                )));
            }
            partial_sigs.push(signature::to_partial_signature(&signature.signature)?);
        }

        for ((input, key), partial_sig) in psbt
            .inputs
            .iter_mut()
            .zip(&plan.signer_keys)
            .zip(partial_sigs)
        {
            input.partial_sigs.insert(*key, partial_sig);
        }
        Ok(())
    }
}
