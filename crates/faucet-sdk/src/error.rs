use thiserror::Error;

use crate::network::Network;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("address belongs to {found}, expected {expected}")]
    NetworkMismatch { expected: Network, found: Network },

    #[error("insufficient funds: short by {shortfall} sats")]
    InsufficientFunds { shortfall: u64 },

    #[error("amount overflow: {0}")]
    AmountOverflow(String),

    #[error("invalid locktime: {0}")]
    InvalidLocktime(i64),

    #[error("invalid faucet parameters: {0}")]
    InvalidParams(String),

    #[error("invalid UTXO: {0}")]
    InvalidUtxo(String),

    #[error("contract artifact error: {0}")]
    Artifact(String),

    #[error("unknown contract function: {0}")]
    UnknownFunction(String),

    #[error("credential error: {0}")]
    Credential(String),

    #[error("credential does not match the faucet owner")]
    CredentialMismatch,

    #[error("signature required to finalize `{0}`")]
    MissingSigner(String),

    #[error("electrum error: {0}")]
    Electrum(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("broadcast error: {0}")]
    Broadcast(String),

    #[error("blocking task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, Error>;
