use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{NaiveDateTime, TimeDelta, Utc};
use faucet_sdk::{
    CashAddress, ChainBackend, ElectrumBackend, FaucetOptions, FaucetParams, FaucetSdk, Network,
    OwnerCredential, SweepResult,
};
use faucet_store::{ClaimInfo, FaucetFilter, FaucetInfo, FaucetStore, NewClaim};
use serde::Serialize;

use crate::config::FaucetConfig;
use crate::error::{Result, ServiceError};

/// A broadcast claim that has been recorded in the store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimReceipt {
    pub claim_id: i32,
    pub faucet_id: i32,
    pub txid: String,
    pub recipient: String,
    pub satoshis: u64,
    pub fee: u64,
}

/// Operator-facing faucet service: the store plus a chain backend for one network.
pub struct FaucetService<B: ChainBackend = ElectrumBackend> {
    config: FaucetConfig,
    store: Mutex<FaucetStore>,
    chain: Arc<B>,
    /// Held from the cooldown check until the claim is recorded.
    claim_lock: tokio::sync::Mutex<()>,
}

impl FaucetService<ElectrumBackend> {
    /// Open the store under `data_dir` and connect through the configured Fulcrum server.
    pub fn open(data_dir: &Path, config: FaucetConfig) -> Result<Self> {
        config.validate()?;
        let db_path = config.database_path_in(data_dir);
        let db_path = db_path
            .to_str()
            .ok_or_else(|| ServiceError::Config(format!("non-UTF-8 path {}", db_path.display())))?;
        let store = FaucetStore::open(db_path)?;
        let chain = ElectrumBackend::new(config.electrum_url());
        log::info!(
            "faucet service on {} via {}",
            config.network,
            chain.electrum_url()
        );
        Ok(Self::with_backend(config, store, chain))
    }
}

impl<B: ChainBackend + Send + Sync + 'static> FaucetService<B> {
    pub fn with_backend(config: FaucetConfig, store: FaucetStore, chain: B) -> Self {
        Self {
            config,
            store: Mutex::new(store),
            chain: Arc::new(chain),
            claim_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> &FaucetConfig {
        &self.config
    }

    pub fn network(&self) -> Network {
        self.config.network
    }

    pub fn chain(&self) -> &B {
        &self.chain
    }

    fn store(&self) -> Result<MutexGuard<'_, FaucetStore>> {
        self.store
            .lock()
            .map_err(|_| ServiceError::Task("store lock poisoned".to_string()))
    }

    fn sdk(&self, params: &FaucetParams) -> Result<FaucetSdk<Arc<B>>> {
        let options = FaucetOptions {
            network: self.config.network,
        };
        Ok(
            FaucetSdk::with_backend(params.clone(), options, Arc::clone(&self.chain))?
                .with_fee_rate(self.config.fee_rate),
        )
    }

    fn faucet(&self, faucet_id: i32) -> Result<FaucetInfo> {
        self.store()?
            .get_faucet(faucet_id)?
            .ok_or(ServiceError::FaucetNotFound(faucet_id))
    }

    // ==================== Faucets ====================

    /// Register a faucet contract paying `payout_sats` per claim, owned by `owner_address`.
    /// The claim cap falls back to the configured one.
    pub fn create_faucet(
        &self,
        passcode: &str,
        payout_sats: u64,
        owner_address: &str,
        max_claim_count: Option<u32>,
    ) -> Result<FaucetInfo> {
        if passcode.is_empty() {
            return Err(ServiceError::InvalidPasscode);
        }
        let network = self.config.network;
        let params = FaucetParams::new(passcode, payout_sats, owner_address, network)?;
        let max_claim_count = max_claim_count.or(self.config.max_claim_count);
        let faucet_id = self
            .store()?
            .insert_faucet(&params, network, max_claim_count)?;
        let info = self.faucet(faucet_id)?;
        log::info!("faucet {faucet_id} at {}", info.address);
        Ok(info)
    }

    pub fn faucets(&self, filter: &FaucetFilter) -> Result<Vec<FaucetInfo>> {
        Ok(self.store()?.list_faucets(filter)?)
    }

    /// Query the chain for a faucet's balance and cache it.
    pub async fn refresh_balance(&self, faucet_id: i32) -> Result<u64> {
        let faucet = self.faucet(faucet_id)?;
        let sdk = self.sdk(&faucet.params)?;
        let balance = tokio::task::spawn_blocking(move || sdk.balance())
            .await
            .map_err(|e| ServiceError::Task(e.to_string()))??;

        let total = balance.total();
        self.store()?.update_balance(faucet_id, total)?;
        log::debug!("faucet {faucet_id} balance {total} sats");
        Ok(total)
    }

    // ==================== Claims ====================

    pub async fn claim(
        &self,
        network: Network,
        address: &str,
        passcode: &str,
        ip: Option<&str>,
    ) -> Result<ClaimReceipt> {
        self.claim_at(network, address, passcode, ip, Utc::now().naive_utc())
            .await
    }

    /// Pay out one claim as of `now` (UTC): check the address and cooldown,
    /// broadcast through the first claimable faucet, then record the claim.
    /// Claims are paid one at a time so concurrent requests see each other's records.
    pub async fn claim_at(
        &self,
        network: Network,
        address: &str,
        passcode: &str,
        ip: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<ClaimReceipt> {
        if network != self.config.network {
            return Err(faucet_sdk::Error::NetworkMismatch {
                expected: self.config.network,
                found: network,
            }
            .into());
        }
        let recipient = CashAddress::decode_for(address, network)?.to_string();
        if passcode.is_empty() {
            return Err(ServiceError::InvalidPasscode);
        }

        let _claiming = self.claim_lock.lock().await;
        let faucet = {
            let mut store = self.store()?;
            if let Some(ip) = ip {
                self.check_cooldown(&mut store, ip, now)?;
            }
            match store.find_claimable(network, passcode)? {
                Some(faucet) => faucet,
                None => {
                    let known = store
                        .list_faucets(&FaucetFilter {
                            network: Some(network),
                            ..Default::default()
                        })?
                        .iter()
                        .any(|f| f.params.passcode == passcode);
                    return Err(if known {
                        ServiceError::NoClaimableFaucet { network }
                    } else {
                        ServiceError::InvalidPasscode
                    });
                }
            }
        };

        let sdk = self.sdk(&faucet.params)?;
        let (to, code) = (recipient.clone(), passcode.to_string());
        let result = tokio::task::spawn_blocking(move || sdk.claim(&to, &code))
            .await
            .map_err(|e| ServiceError::Task(e.to_string()))??;

        let txid = result.txid.to_string();
        let claim_id = self
            .store()?
            .record_claim(&NewClaim {
                faucet_id: faucet.id,
                network,
                txid: txid.clone(),
                recipient: recipient.clone(),
                satoshis: result.payout_sats,
                ip: ip.map(str::to_string),
                created_at: now,
            })
            .inspect_err(|e| log::error!("claim {txid} was broadcast but not recorded: {e}"))?;
        log::info!("claim {claim_id}: faucet {} paid {recipient} in {txid}", faucet.id);

        Ok(ClaimReceipt {
            claim_id,
            faucet_id: faucet.id,
            txid,
            recipient,
            satoshis: result.payout_sats,
            fee: result.fee,
        })
    }

    fn check_cooldown(&self, store: &mut FaucetStore, ip: &str, now: NaiveDateTime) -> Result<()> {
        let cooldown = TimeDelta::seconds(self.config.claim_cooldown_secs);
        if cooldown.is_zero() {
            return Ok(());
        }
        let latest = store.claims_by_ip_since(ip, now - cooldown)?;
        if let Some(last) = latest.first() {
            let retry_after_secs = (last.created_at + cooldown - now).num_seconds().max(1);
            log::debug!("ip {ip} on cooldown for {retry_after_secs}s");
            return Err(ServiceError::CooldownActive { retry_after_secs });
        }
        Ok(())
    }

    pub fn recent_claims(&self, limit: i64) -> Result<Vec<ClaimInfo>> {
        Ok(self.store()?.recent_claims(limit)?)
    }

    // ==================== Sweep ====================

    /// Spend every UTXO of a faucet back to its owner, or to `recipient`.
    pub async fn sweep(
        &self,
        faucet_id: i32,
        wif: &str,
        recipient: Option<&str>,
    ) -> Result<SweepResult> {
        let faucet = self.faucet(faucet_id)?;
        let credential = OwnerCredential::from_wif(wif, self.config.network)?;
        let sdk = self.sdk(&faucet.params)?;
        let recipient = recipient.map(str::to_string);

        let result =
            tokio::task::spawn_blocking(move || sdk.sweep(&credential, recipient.as_deref()))
                .await
                .map_err(|e| ServiceError::Task(e.to_string()))??;

        self.store()?.update_balance(faucet_id, 0)?;
        log::info!(
            "faucet {faucet_id} swept {} sats to {} in {}",
            result.swept_sats,
            result.recipient,
            result.txid
        );
        Ok(result)
    }
}
