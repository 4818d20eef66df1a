use crate::cashaddr::CashAddress;
use crate::chain::{Balance, ChainBackend, ElectrumBackend};
use crate::claim::{CLAIM_TX_FEE, ClaimParams, build_claim};
use crate::contract::{CompiledFaucet, FaucetAddresses};
use crate::credential::OwnerCredential;
use crate::error::{Error, Result};
use crate::network::Network;
use crate::params::{FaucetOptions, FaucetParams};
use crate::plan::{Destination, TransactionPlan};
use crate::sweep::{DEFAULT_FEE_RATE, SweepParams, build_sweep};
use crate::transaction::{FinalizedTransaction, finalize, finalize_async};
use crate::utxo::{Txid, Utxo};

/// Derive the contract's plain and token-aware addresses.
pub fn compile_contract(params: &FaucetParams, options: FaucetOptions) -> Result<FaucetAddresses> {
    let contract = CompiledFaucet::new(params.clone())?;
    Ok(contract.addresses(options.network))
}

/// Build and finalize a claim against `utxo`.
pub async fn faucet_claim(
    params: &FaucetParams,
    options: FaucetOptions,
    utxo: Utxo,
    recipient: &str,
    passcode: &str,
    locktime: Option<i64>,
) -> Result<FinalizedTransaction> {
    let contract = CompiledFaucet::new(params.clone())?;
    let claim = ClaimParams {
        utxo,
        recipient: Destination::parse(recipient, options.network)?,
        passcode: passcode.to_string(),
        locktime,
    };
    let plan = build_claim(&contract, options.network, &claim)?;
    finalize_async(plan, None).await
}

/// Build and finalize an owner sweep of `utxos`. The recipient defaults to the
/// owner address.
pub async fn faucet_sweep(
    params: &FaucetParams,
    options: FaucetOptions,
    credential: OwnerCredential,
    utxos: Vec<Utxo>,
    recipient: Option<&str>,
    locktime: Option<i64>,
) -> Result<FinalizedTransaction> {
    let contract = CompiledFaucet::new(params.clone())?;
    let recipient = sweep_recipient(params, options.network, recipient)?;
    let sweep = SweepParams {
        utxos,
        recipient,
        locktime,
        fee_rate: DEFAULT_FEE_RATE,
    };
    let plan = build_sweep(&contract, &credential, &sweep)?;
    finalize_async(plan, Some(credential)).await
}

fn sweep_recipient(
    params: &FaucetParams,
    network: Network,
    recipient: Option<&str>,
) -> Result<CashAddress> {
    match recipient {
        Some(addr) => CashAddress::decode_for(addr, network),
        None => Ok(params.owner_address(network)),
    }
}

/// Result of a broadcast claim.
#[derive(Debug, Clone)]
pub struct ClaimResult {
    pub txid: Txid,
    pub recipient: String,
    pub payout_sats: u64,
    pub fee: u64,
    /// The contract UTXO that funded the claim.
    pub spent: Utxo,
}

/// Result of a broadcast sweep.
#[derive(Debug, Clone)]
pub struct SweepResult {
    pub txid: Txid,
    pub recipient: String,
    pub swept_sats: u64,
    pub fee: u64,
    pub inputs: usize,
}

/// A faucet contract bound to a network and a chain backend.
///
/// Methods block on backend I/O; async callers should run them on a blocking task.
pub struct FaucetSdk<B: ChainBackend = ElectrumBackend> {
    contract: CompiledFaucet,
    network: Network,
    chain: B,
    fee_rate: u64,
}

impl FaucetSdk<ElectrumBackend> {
    /// Connect through Electrum, falling back to the network's public Fulcrum server.
    pub fn connect(
        params: FaucetParams,
        options: FaucetOptions,
        electrum_url: Option<&str>,
    ) -> Result<Self> {
        let url = electrum_url.unwrap_or_else(|| options.network.default_electrum_url());
        Self::with_backend(params, options, ElectrumBackend::new(url))
    }
}

impl<B: ChainBackend> FaucetSdk<B> {
    pub fn with_backend(params: FaucetParams, options: FaucetOptions, chain: B) -> Result<Self> {
        Ok(Self {
            contract: CompiledFaucet::new(params)?,
            network: options.network,
            chain,
            fee_rate: DEFAULT_FEE_RATE,
        })
    }

    pub fn with_fee_rate(mut self, fee_rate: u64) -> Self {
        self.fee_rate = fee_rate;
        self
    }

    pub fn contract(&self) -> &CompiledFaucet {
        &self.contract
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn chain(&self) -> &B {
        &self.chain
    }

    pub fn addresses(&self) -> FaucetAddresses {
        self.contract.addresses(self.network)
    }

    pub fn utxos(&self) -> Result<Vec<Utxo>> {
        self.chain.list_unspent(&self.contract.locking_script())
    }

    pub fn balance(&self) -> Result<Balance> {
        self.chain.get_balance(&self.contract.locking_script())
    }

    /// First plain UTXO large enough to fund a payout plus the claim fee.
    pub fn select_claim_utxo(&self, utxos: &[Utxo]) -> Result<Utxo> {
        let needed = self.contract.params().payout_sats + CLAIM_TX_FEE;
        utxos
            .iter()
            .find(|u| !u.has_token() && u.value >= needed)
            .cloned()
            .ok_or_else(|| {
                let best = utxos
                    .iter()
                    .filter(|u| !u.has_token())
                    .map(|u| u.value)
                    .max()
                    .unwrap_or(0);
                Error::InsufficientFunds {
                    shortfall: needed - best,
                }
            })
    }

    /// Select a UTXO and build the claim plan without broadcasting.
    pub fn prepare_claim(
        &self,
        recipient: &str,
        passcode: &str,
        locktime: Option<i64>,
    ) -> Result<TransactionPlan> {
        let recipient = Destination::parse(recipient, self.network)?;
        let utxo = self.select_claim_utxo(&self.utxos()?)?;
        let claim = ClaimParams {
            utxo,
            recipient,
            passcode: passcode.to_string(),
            locktime,
        };
        build_claim(&self.contract, self.network, &claim)
    }

    pub fn claim(&self, recipient: &str, passcode: &str) -> Result<ClaimResult> {
        let plan = self.prepare_claim(recipient, passcode, None)?;
        let tx = finalize(&plan, None)?;
        let txid = self.chain.broadcast(&tx.hex())?;
        if txid != tx.txid {
            log::warn!("backend reported txid {txid}, expected {}", tx.txid);
        }

        let spent = plan.inputs()[0].clone();
        log::info!("claim {txid} paid {recipient} from {}", spent.outpoint);

        Ok(ClaimResult {
            txid,
            recipient: recipient.to_string(),
            payout_sats: self.contract.params().payout_sats,
            fee: tx.fee,
            spent,
        })
    }

    /// Build the sweep plan over every contract UTXO.
    pub fn prepare_sweep(
        &self,
        credential: &OwnerCredential,
        recipient: Option<&str>,
        locktime: Option<i64>,
    ) -> Result<TransactionPlan> {
        let recipient = sweep_recipient(self.contract.params(), self.network, recipient)?;
        let sweep = SweepParams {
            utxos: self.utxos()?,
            recipient,
            locktime,
            fee_rate: self.fee_rate,
        };
        build_sweep(&self.contract, credential, &sweep)
    }

    pub fn sweep(
        &self,
        credential: &OwnerCredential,
        recipient: Option<&str>,
    ) -> Result<SweepResult> {
        let plan = self.prepare_sweep(credential, recipient, None)?;
        let tx = finalize(&plan, Some(credential))?;
        let txid = self.chain.broadcast(&tx.hex())?;

        let recipient = plan
            .outputs()
            .iter()
            .find(|o| o.payload.category().is_none())
            .or_else(|| plan.outputs().first())
            .map(|o| o.destination.to_string())
            .unwrap_or_default();
        log::info!(
            "sweep {txid} moved {} sats from {} inputs",
            plan.output_total(),
            plan.inputs().len()
        );

        Ok(SweepResult {
            txid,
            recipient,
            swept_sats: plan.output_total(),
            fee: tx.fee,
            inputs: plan.inputs().len(),
        })
    }
}
