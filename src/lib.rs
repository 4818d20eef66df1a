pub mod commands;
pub mod config;
mod error;
pub mod service;

pub use config::{CONFIG_FILE, DEFAULT_CLAIM_COOLDOWN_SECS, FaucetConfig, MAX_FEE_RATE};
pub use error::{Result, ServiceError};
pub use service::{ClaimReceipt, FaucetService};
