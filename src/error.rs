use faucet_sdk::Network;
use faucet_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("no claimable faucet on {network}")]
    NoClaimableFaucet { network: Network },

    #[error("invalid passcode")]
    InvalidPasscode,

    #[error("claim cooldown active, retry in {retry_after_secs}s")]
    CooldownActive { retry_after_secs: i64 },

    #[error("faucet {0} not found")]
    FaucetNotFound(i32),

    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Sdk(#[from] faucet_sdk::Error),

    #[error("task join error: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
