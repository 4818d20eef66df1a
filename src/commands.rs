use std::path::PathBuf;

use clap::{Parser, Subcommand};
use faucet_sdk::{FaucetOptions, FaucetParams, Network, compile_contract};
use faucet_store::{ClaimInfo, FaucetFilter, FaucetInfo, format_timestamp};
use serde_json::{Value, json};

use crate::config::FaucetConfig;
use crate::error::{Result, ServiceError};
use crate::service::FaucetService;

/// Environment variable read for the owner key when `--wif` is omitted.
pub const OWNER_WIF_ENV: &str = "FAUCET_OWNER_WIF";

#[derive(Debug, Parser)]
#[command(name = "bch-faucet", about = "Covenant faucet for Bitcoin Cash")]
pub struct Cli {
    /// Directory holding faucet_config.json and the database.
    #[arg(long, global = true, default_value = ".")]
    pub data_dir: PathBuf,

    /// Network used when no config file exists yet, or to override it.
    #[arg(long, global = true)]
    pub network: Option<Network>,

    /// Override the configured Fulcrum endpoint.
    #[arg(long, global = true)]
    pub electrum_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the contract addresses for a set of parameters without storing them.
    Compile {
        #[arg(long)]
        passcode: String,
        #[arg(long)]
        payout: u64,
        #[arg(long)]
        owner: String,
    },
    /// Register a faucet contract.
    Create {
        #[arg(long)]
        passcode: String,
        #[arg(long)]
        payout: u64,
        #[arg(long)]
        owner: String,
        /// Stop accepting claims after this many.
        #[arg(long)]
        max_claims: Option<u32>,
    },
    /// Pay one claim to an address.
    Claim {
        address: String,
        #[arg(long)]
        passcode: String,
        /// Client IP used for the claim cooldown.
        #[arg(long)]
        ip: Option<String>,
    },
    /// Move a faucet's funds to its owner.
    Sweep {
        faucet_id: i32,
        #[arg(long)]
        wif: Option<String>,
        #[arg(long)]
        recipient: Option<String>,
    },
    /// Refresh cached balances from the chain.
    Balance { faucet_id: Option<i32> },
    /// List recent claims.
    Claims {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

/// Resolve the config for this invocation: saved file, then CLI overrides.
pub fn resolve_config(cli: &Cli) -> Result<FaucetConfig> {
    let mut config =
        FaucetConfig::load_or_init(&cli.data_dir, cli.network.unwrap_or(Network::Testnet))?;
    if let Some(network) = cli.network
        && network != config.network
    {
        log::warn!("overriding configured network {} with {network}", config.network);
        config.network = network;
    }
    if let Some(ref url) = cli.electrum_url {
        config.electrum_url = Some(url.clone());
    }
    Ok(config)
}

pub async fn run(cli: Cli) -> Result<Value> {
    if let Command::Compile {
        passcode,
        payout,
        owner,
    } = &cli.command
    {
        let network = match cli.network {
            Some(network) => network,
            None => FaucetConfig::load(&cli.data_dir)?
                .map(|c| c.network)
                .unwrap_or(Network::Testnet),
        };
        let params = FaucetParams::new(passcode.as_str(), *payout, owner, network)?;
        let addresses = compile_contract(&params, FaucetOptions { network })?;
        return Ok(json!({
            "network": network,
            "address": addresses.address,
            "tokenAddress": addresses.token_address,
        }));
    }

    let config = resolve_config(&cli)?;
    let service = FaucetService::open(&cli.data_dir, config)?;
    execute(&service, cli.command).await
}

/// Run a stateful subcommand against `service`.
pub async fn execute<B>(service: &FaucetService<B>, command: Command) -> Result<Value>
where
    B: faucet_sdk::ChainBackend + Send + Sync + 'static,
{
    match command {
        Command::Compile { .. } => Err(ServiceError::Config(
            "compile does not need a service".to_string(),
        )),
        Command::Create {
            passcode,
            payout,
            owner,
            max_claims,
        } => {
            let info = service.create_faucet(&passcode, payout, &owner, max_claims)?;
            Ok(faucet_json(&info))
        }
        Command::Claim {
            address,
            passcode,
            ip,
        } => {
            let receipt = service
                .claim(service.network(), &address, &passcode, ip.as_deref())
                .await?;
            let explorer = service.network().explorer_tx_url(&receipt.txid);
            let mut out = serde_json::to_value(&receipt)
                .map_err(|e| ServiceError::Config(e.to_string()))?;
            out["explorer"] = json!(explorer);
            Ok(out)
        }
        Command::Sweep {
            faucet_id,
            wif,
            recipient,
        } => {
            let wif = match wif {
                Some(wif) => wif,
                None => std::env::var(OWNER_WIF_ENV).map_err(|_| {
                    ServiceError::Config(format!("pass --wif or set {OWNER_WIF_ENV}"))
                })?,
            };
            let result = service
                .sweep(faucet_id, &wif, recipient.as_deref())
                .await?;
            Ok(json!({
                "txid": result.txid.to_string(),
                "recipient": result.recipient,
                "sweptSats": result.swept_sats,
                "fee": result.fee,
                "inputs": result.inputs,
            }))
        }
        Command::Balance { faucet_id } => {
            let ids = match faucet_id {
                Some(id) => vec![id],
                None => service
                    .faucets(&FaucetFilter {
                        network: Some(service.network()),
                        ..Default::default()
                    })?
                    .iter()
                    .map(|f| f.id)
                    .collect(),
            };
            let mut balances = Vec::with_capacity(ids.len());
            for id in ids {
                let sats = service.refresh_balance(id).await?;
                balances.push(json!({ "faucetId": id, "balanceSats": sats }));
            }
            Ok(Value::Array(balances))
        }
        Command::Claims { limit } => {
            let claims = service.recent_claims(limit)?;
            Ok(Value::Array(claims.iter().map(claim_json).collect()))
        }
    }
}

fn faucet_json(info: &FaucetInfo) -> Value {
    json!({
        "id": info.id,
        "network": info.network,
        "address": info.address,
        "tokenAddress": info.token_address,
        "payoutSats": info.params.payout_sats,
        "ownerAddress": info.owner_address,
        "claimCount": info.claim_count,
        "maxClaimCount": info.max_claim_count,
        "balanceSats": info.balance_sats,
        "createdAt": info.created_at,
    })
}

fn claim_json(claim: &ClaimInfo) -> Value {
    json!({
        "id": claim.id,
        "faucetId": claim.faucet_id,
        "network": claim.network,
        "txid": claim.txid,
        "recipient": claim.recipient,
        "satoshis": claim.satoshis,
        "createdAt": format_timestamp(&claim.created_at),
    })
}
