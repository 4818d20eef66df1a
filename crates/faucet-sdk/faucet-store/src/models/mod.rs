pub mod claim;
pub mod faucet;

pub use claim::{ClaimRow, NewClaimRow};
pub use faucet::{FaucetRow, NewFaucetRow};
