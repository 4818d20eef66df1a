pub use bitcoin::secp256k1;

pub mod cashaddr;
pub mod chain;
pub mod claim;
pub mod contract;
pub mod credential;
pub mod error;
pub mod network;
pub mod params;
pub mod plan;
pub mod script;
pub mod sdk;
pub mod size;
pub mod sweep;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod token;
pub mod transaction;
pub mod utxo;

// Core types
pub use cashaddr::{AddressType, CashAddress, to_token_address};
pub use chain::{Balance, ChainBackend, ElectrumBackend, electrum_script_hash};
pub use contract::{
    Artifact, CLAIM_FUNCTION, CompiledFaucet, FaucetAddresses, FunctionArg, FunctionCall,
    OWNER_UNLOCK_FUNCTION,
};
pub use credential::OwnerCredential;
pub use error::{Error, Result};
pub use network::Network;
pub use params::{FaucetOptions, FaucetParams};
pub use token::{Capability, Category, PLAIN_DUST, Payload, TOKEN_DUST};
pub use utxo::{Outpoint, RawUtxo, Txid, Utxo, parse_utxos};

// Plans and pipelines
pub use claim::{CLAIM_TX_FEE, ClaimParams, build_claim};
pub use plan::{
    Destination, FeeMode, Output, TransactionPlan, lenient_locktime, parse_locktime,
};
pub use size::{
    SIGNATURE_PLACEHOLDER_LEN, estimate_input_size, input_size, output_size,
    tx_size_without_inputs,
};
pub use sweep::{
    DEFAULT_FEE_RATE, SweepParams, build_sweep, deduct_fee, estimate_sweep_fee, sweep_outputs,
};
pub use transaction::{FinalizedTransaction, finalize, finalize_async};

// High-level API
pub use sdk::{ClaimResult, FaucetSdk, SweepResult, compile_contract, faucet_claim, faucet_sweep};
