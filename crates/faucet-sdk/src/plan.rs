//! Unsigned transaction plans handed from the pipelines to finalization.

use std::fmt;

use crate::cashaddr::CashAddress;
use crate::contract::FunctionCall;
use crate::error::{Error, Result};
use crate::network::Network;
use crate::token::Payload;
use crate::utxo::Utxo;

/// Where an output pays to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    Address(CashAddress),
    Script(Vec<u8>),
}

impl Destination {
    /// Accept a CashAddr for `network` or a hex-encoded locking script.
    pub fn parse(s: &str, network: Network) -> Result<Self> {
        let s = s.trim();
        if !s.contains(':')
            && s.len() % 2 == 0
            && let Ok(script) = hex::decode(s)
            && !script.is_empty()
        {
            return Ok(Destination::Script(script));
        }
        Ok(Destination::Address(CashAddress::decode_for(s, network)?))
    }

    pub fn locking_script(&self) -> Vec<u8> {
        match self {
            Destination::Address(addr) => addr.locking_script(),
            Destination::Script(script) => script.clone(),
        }
    }
}

impl From<CashAddress> for Destination {
    fn from(addr: CashAddress) -> Self {
        Destination::Address(addr)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Address(addr) => write!(f, "{addr}"),
            Destination::Script(script) => write!(f, "{}", hex::encode(script)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Output {
    pub destination: Destination,
    pub value: u64,
    pub payload: Payload,
}

impl Output {
    pub fn new(destination: impl Into<Destination>, value: u64) -> Self {
        Self {
            destination: destination.into(),
            value,
            payload: Payload::Plain,
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn dust_floor(&self) -> u64 {
        self.payload.dust_floor()
    }

    pub fn locking_script(&self) -> Vec<u8> {
        self.destination.locking_script()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeeMode {
    /// A fixed fee; anything between it and the inputs' surplus also goes to miners.
    Hardcoded(u64),
    /// The fee has already been taken out of the outputs.
    Deducted,
}

/// Ordered inputs and outputs spending the contract through one function call.
/// Each builder method consumes the plan and returns the extended one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionPlan {
    call: FunctionCall,
    redeem_script: Vec<u8>,
    inputs: Vec<Utxo>,
    outputs: Vec<Output>,
    locktime: Option<u32>,
    fee_mode: FeeMode,
}

impl TransactionPlan {
    pub fn new(call: FunctionCall, redeem_script: Vec<u8>) -> Self {
        Self {
            call,
            redeem_script,
            inputs: Vec::new(),
            outputs: Vec::new(),
            locktime: None,
            fee_mode: FeeMode::Deducted,
        }
    }

    pub fn with_input(mut self, utxo: Utxo) -> Self {
        self.inputs.push(utxo);
        self
    }

    pub fn with_inputs(self, utxos: impl IntoIterator<Item = Utxo>) -> Self {
        utxos.into_iter().fold(self, Self::with_input)
    }

    pub fn with_output(mut self, output: Output) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn with_outputs(self, outputs: impl IntoIterator<Item = Output>) -> Self {
        outputs.into_iter().fold(self, Self::with_output)
    }

    pub fn with_hardcoded_fee(mut self, fee: u64) -> Self {
        self.fee_mode = FeeMode::Hardcoded(fee);
        self
    }

    pub fn with_locktime(mut self, locktime: u32) -> Self {
        self.locktime = Some(locktime);
        self
    }

    pub fn call(&self) -> &FunctionCall {
        &self.call
    }

    pub fn redeem_script(&self) -> &[u8] {
        &self.redeem_script
    }

    pub fn inputs(&self) -> &[Utxo] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn locktime(&self) -> Option<u32> {
        self.locktime
    }

    pub fn fee_mode(&self) -> FeeMode {
        self.fee_mode
    }

    /// Saturates at `u64::MAX`; [`checked_total`] reports the overflow instead.
    pub fn input_total(&self) -> u64 {
        self.inputs
            .iter()
            .fold(0u64, |acc, u| acc.saturating_add(u.value))
    }

    /// Saturates at `u64::MAX`; [`checked_total`] reports the overflow instead.
    pub fn output_total(&self) -> u64 {
        self.outputs
            .iter()
            .fold(0u64, |acc, o| acc.saturating_add(o.value))
    }

    /// Satoshis left to miners.
    pub fn fee(&self) -> u64 {
        self.input_total().saturating_sub(self.output_total())
    }
}

/// Sum of `values`, or `AmountOverflow` naming `what` if it exceeds `u64`.
pub fn checked_total(values: impl IntoIterator<Item = u64>, what: &str) -> Result<u64> {
    values
        .into_iter()
        .try_fold(0u64, |acc, v| acc.checked_add(v))
        .ok_or_else(|| Error::AmountOverflow(format!("{what} exceed u64")))
}

/// Locktime as a block height or timestamp. Values outside `0..=u32::MAX` are rejected.
pub fn parse_locktime(value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::InvalidLocktime(value))
}

/// Like [`parse_locktime`], but an out-of-range value is logged and dropped.
pub fn lenient_locktime(value: Option<i64>) -> Option<u32> {
    let value = value?;
    match parse_locktime(value) {
        Ok(locktime) => Some(locktime),
        Err(e) => {
            log::warn!("ignoring locktime: {e}");
            None
        }
    }
}
