//! Serialization and signing of transaction plans.

use crate::credential::{OwnerCredential, SIGHASH_ALL_FORKID};
use crate::error::{Error, Result};
use crate::plan::{FeeMode, Output, TransactionPlan, checked_total};
use crate::script::{hash256, p2pkh_locking_script, push_data, write_compact_size, write_var_bytes};
use crate::size::input_script;
use crate::utxo::{Txid, Utxo};

pub const TX_VERSION: u32 = 2;
/// Final but locktime-enabled.
pub const INPUT_SEQUENCE: u32 = 0xffff_fffe;

/// A fully signed transaction ready to broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedTransaction {
    pub txid: Txid,
    pub bytes: Vec<u8>,
    pub fee: u64,
}

impl FinalizedTransaction {
    pub fn hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Sign and serialize `plan`. Contract inputs whose function takes a signature
/// are signed by `signer`; inputs carrying their own credential are unlocked as
/// P2PKH with it. A hardcoded fee must be covered by the inputs' surplus.
pub fn finalize(
    plan: &TransactionPlan,
    signer: Option<&OwnerCredential>,
) -> Result<FinalizedTransaction> {
    let call = plan.call();
    if call.needs_signature() && signer.is_none() {
        return Err(Error::MissingSigner(call.name.clone()));
    }
    if plan.inputs().is_empty() {
        return Err(Error::InvalidParams("transaction has no inputs".into()));
    }
    let input_total = checked_total(plan.inputs().iter().map(|u| u.value), "input values")?;
    let output_total = checked_total(plan.outputs().iter().map(|o| o.value), "output values")?;
    let required = match plan.fee_mode() {
        FeeMode::Hardcoded(fee) => output_total
            .checked_add(fee)
            .ok_or_else(|| Error::AmountOverflow("outputs plus fee exceed u64".into()))?,
        FeeMode::Deducted => output_total,
    };
    if required > input_total {
        return Err(Error::InsufficientFunds {
            shortfall: required - input_total,
        });
    }

    let locktime = plan.locktime().unwrap_or(0);
    let sighash = SighashCache::new(plan.inputs(), plan.outputs(), locktime);

    let mut scripts = Vec::with_capacity(plan.inputs().len());
    for (index, utxo) in plan.inputs().iter().enumerate() {
        let script = match &utxo.credential {
            Some(credential) => {
                let script_code = p2pkh_locking_script(&credential.pubkey_hash());
                let signature = credential.sign_digest(sighash.digest(index, &script_code));
                let mut script = Vec::with_capacity(signature.len() + 35);
                push_data(&mut script, &signature);
                push_data(&mut script, &credential.public_key());
                script
            }
            None => {
                let signature = match signer {
                    Some(signer) if call.needs_signature() => {
                        signer.sign_digest(sighash.digest(index, plan.redeem_script()))
                    }
                    _ => Vec::new(),
                };
                input_script(plan.redeem_script(), call, &signature)
            }
        };
        scripts.push(script);
    }

    let bytes = serialize(plan.inputs(), &scripts, plan.outputs(), locktime);
    let txid = Txid::from_wire_bytes(hash256(&bytes));
    let fee = input_total - output_total;

    log::debug!(
        "finalized {} `{}`: {} bytes, fee {fee} sats",
        txid,
        call.name,
        bytes.len()
    );

    Ok(FinalizedTransaction { txid, bytes, fee })
}

/// [`finalize`] on a blocking task.
pub async fn finalize_async(
    plan: TransactionPlan,
    signer: Option<OwnerCredential>,
) -> Result<FinalizedTransaction> {
    tokio::task::spawn_blocking(move || finalize(&plan, signer.as_ref()))
        .await
        .map_err(|e| Error::Task(e.to_string()))?
}

fn write_outpoint(buf: &mut Vec<u8>, utxo: &Utxo) {
    buf.extend_from_slice(&utxo.outpoint.txid.wire_bytes());
    buf.extend_from_slice(&utxo.outpoint.vout.to_le_bytes());
}

fn write_output(buf: &mut Vec<u8>, output: &Output) {
    buf.extend_from_slice(&output.value.to_le_bytes());
    let mut script = output.payload.prefix();
    script.extend_from_slice(&output.locking_script());
    write_var_bytes(buf, &script);
}

fn serialize(inputs: &[Utxo], scripts: &[Vec<u8>], outputs: &[Output], locktime: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&TX_VERSION.to_le_bytes());
    write_compact_size(&mut buf, inputs.len() as u64);
    for (utxo, script) in inputs.iter().zip(scripts) {
        write_outpoint(&mut buf, utxo);
        write_var_bytes(&mut buf, script);
        buf.extend_from_slice(&INPUT_SEQUENCE.to_le_bytes());
    }
    write_compact_size(&mut buf, outputs.len() as u64);
    for output in outputs {
        write_output(&mut buf, output);
    }
    buf.extend_from_slice(&locktime.to_le_bytes());
    buf
}

/// Shared parts of the `SIGHASH_ALL | FORKID` preimage.
struct SighashCache<'a> {
    inputs: &'a [Utxo],
    hash_prevouts: [u8; 32],
    hash_sequence: [u8; 32],
    hash_outputs: [u8; 32],
    locktime: u32,
}

impl<'a> SighashCache<'a> {
    fn new(inputs: &'a [Utxo], outputs: &[Output], locktime: u32) -> Self {
        let mut prevouts = Vec::with_capacity(inputs.len() * 36);
        let mut sequences = Vec::with_capacity(inputs.len() * 4);
        for utxo in inputs {
            write_outpoint(&mut prevouts, utxo);
            sequences.extend_from_slice(&INPUT_SEQUENCE.to_le_bytes());
        }
        let mut serialized_outputs = Vec::new();
        for output in outputs {
            write_output(&mut serialized_outputs, output);
        }
        Self {
            inputs,
            hash_prevouts: hash256(&prevouts),
            hash_sequence: hash256(&sequences),
            hash_outputs: hash256(&serialized_outputs),
            locktime,
        }
    }

    /// Digest signed by input `index`. The spent token prefix precedes the script code.
    fn digest(&self, index: usize, script_code: &[u8]) -> [u8; 32] {
        let utxo = &self.inputs[index];
        let mut preimage = Vec::with_capacity(200 + script_code.len());
        preimage.extend_from_slice(&TX_VERSION.to_le_bytes());
        preimage.extend_from_slice(&self.hash_prevouts);
        preimage.extend_from_slice(&self.hash_sequence);
        write_outpoint(&mut preimage, utxo);
        preimage.extend_from_slice(&utxo.payload.prefix());
        write_var_bytes(&mut preimage, script_code);
        preimage.extend_from_slice(&utxo.value.to_le_bytes());
        preimage.extend_from_slice(&INPUT_SEQUENCE.to_le_bytes());
        preimage.extend_from_slice(&self.hash_outputs);
        preimage.extend_from_slice(&self.locktime.to_le_bytes());
        preimage.extend_from_slice(&u32::from(SIGHASH_ALL_FORKID).to_le_bytes());
        hash256(&preimage)
    }
}
