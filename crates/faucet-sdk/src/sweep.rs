use crate::cashaddr::CashAddress;
use crate::contract::{CompiledFaucet, FunctionCall};
use crate::credential::OwnerCredential;
use crate::error::{Error, Result};
use crate::plan::{Output, TransactionPlan, checked_total, lenient_locktime};
use crate::script::compact_size_len;
use crate::size::{estimate_input_size, p2pkh_input_size, tx_size_without_inputs};
use crate::token::PLAIN_DUST;
use crate::utxo::Utxo;

/// Satoshis per byte.
pub const DEFAULT_FEE_RATE: u64 = 1;

/// Parameters for sweeping contract UTXOs to a recipient.
#[derive(Debug, Clone)]
pub struct SweepParams {
    pub utxos: Vec<Utxo>,
    pub recipient: CashAddress,
    /// Applied only when it fits `0..=u32::MAX`.
    pub locktime: Option<i64>,
    pub fee_rate: u64,
}

impl SweepParams {
    pub fn new(utxos: Vec<Utxo>, recipient: CashAddress) -> Self {
        Self {
            utxos,
            recipient,
            locktime: None,
            fee_rate: DEFAULT_FEE_RATE,
        }
    }
}

/// Outputs before fee deduction: one pass-through output per token UTXO, in input
/// order, to the token-aware recipient; then all plain value consolidated into one
/// output if it exceeds the dust limit.
pub fn sweep_outputs(utxos: &[Utxo], recipient: &CashAddress) -> Result<Vec<Output>> {
    let token_recipient = recipient.to_token_aware();

    let mut outputs: Vec<Output> = utxos
        .iter()
        .filter(|u| u.has_token())
        .map(|u| Output::new(token_recipient.clone(), u.value).with_payload(u.payload.clone()))
        .collect();

    let plain_total = checked_total(
        utxos.iter().filter(|u| !u.has_token()).map(|u| u.value),
        "plain UTXO values",
    )?;
    if plain_total > PLAIN_DUST {
        outputs.push(Output::new(recipient.clone(), plain_total));
    }
    Ok(outputs)
}

/// Fee for spending `utxos` into `outputs` at `fee_rate`, with signatures sized at
/// their maximum. Never less than the finalized size times the rate.
pub fn estimate_sweep_fee(
    redeem_script: &[u8],
    call: &FunctionCall,
    utxos: &[Utxo],
    outputs: &[Output],
    fee_rate: u64,
) -> Result<u64> {
    let contract_input = estimate_input_size(redeem_script, call.selector, &call.args);
    let inputs: usize = utxos
        .iter()
        .map(|u| {
            if u.credential.is_some() {
                p2pkh_input_size()
            } else {
                contract_input
            }
        })
        .sum();
    let input_count = compact_size_len(utxos.len() as u64);
    let size = (inputs + input_count + tx_size_without_inputs(outputs)) as u64;
    size.checked_mul(fee_rate).ok_or_else(|| {
        Error::AmountOverflow(format!("fee for {size} bytes at {fee_rate} sat/byte"))
    })
}

/// Take `fee` out of `outputs`, last output first, never pushing one below its dust
/// floor. Outputs already below their floor are left alone.
pub fn deduct_fee(mut outputs: Vec<Output>, fee: u64) -> Result<Vec<Output>> {
    let mut remaining = fee;
    for output in outputs.iter_mut().rev() {
        if remaining == 0 {
            break;
        }
        let floor = output.dust_floor();
        if output.value < floor {
            continue;
        }
        let take = (output.value - floor).min(remaining);
        output.value -= take;
        remaining -= take;
    }
    if remaining > 0 {
        return Err(Error::InsufficientFunds {
            shortfall: remaining,
        });
    }
    Ok(outputs)
}

/// Build the owner sweep plan.
pub fn build_sweep(
    contract: &CompiledFaucet,
    credential: &OwnerCredential,
    params: &SweepParams,
) -> Result<TransactionPlan> {
    if credential.pubkey_hash() != contract.params().owner_pkh {
        return Err(Error::CredentialMismatch);
    }

    let call = contract.owner_unlock_call(credential.public_key())?;
    let outputs = sweep_outputs(&params.utxos, &params.recipient)?;
    let fee = estimate_sweep_fee(
        contract.redeem_script(),
        &call,
        &params.utxos,
        &outputs,
        params.fee_rate,
    )?;
    let outputs = deduct_fee(outputs, fee)?;

    log::debug!(
        "sweeping {} UTXOs into {} outputs, fee {fee} sats",
        params.utxos.len(),
        outputs.len()
    );

    let mut plan = TransactionPlan::new(call, contract.redeem_script().to_vec())
        .with_inputs(params.utxos.iter().cloned())
        .with_outputs(outputs);

    if let Some(locktime) = lenient_locktime(params.locktime) {
        plan = plan.with_locktime(locktime);
    }

    Ok(plan)
}
