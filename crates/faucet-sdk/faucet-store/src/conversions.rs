use chrono::NaiveDateTime;
use faucet_sdk::{CompiledFaucet, FaucetParams, Network};

use crate::error::StoreError;
use crate::models::{ClaimRow, FaucetRow, NewClaimRow, NewFaucetRow};
use crate::store::{ClaimInfo, FaucetInfo, NewClaim};

/// Layout of every stored timestamp (UTC), matching SQLite's `datetime('now')`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(s: &str) -> std::result::Result<NaiveDateTime, StoreError> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map_err(|e| StoreError::InvalidData(format!("bad timestamp {s:?}: {e}")))
}

pub fn parse_network(s: &str) -> std::result::Result<Network, StoreError> {
    s.parse().map_err(StoreError::InvalidData)
}

pub fn sats_to_i64(v: u64, field: &str) -> std::result::Result<i64, StoreError> {
    i64::try_from(v).map_err(|_| StoreError::InvalidData(format!("{field}: {v} out of range")))
}

fn i64_to_sats(v: i64, field: &str) -> std::result::Result<u64, StoreError> {
    u64::try_from(v).map_err(|_| StoreError::InvalidData(format!("{field}: negative value {v}")))
}

fn i32_to_count(v: i32, field: &str) -> std::result::Result<u32, StoreError> {
    u32::try_from(v).map_err(|_| StoreError::InvalidData(format!("{field}: negative value {v}")))
}

// --- Rows -> store types ---

impl TryFrom<&FaucetRow> for FaucetInfo {
    type Error = StoreError;

    fn try_from(row: &FaucetRow) -> std::result::Result<Self, Self::Error> {
        let network = parse_network(&row.network)?;
        let payout_sats = i64_to_sats(row.payout_sats, "payout_sats")?;
        let params = FaucetParams::new(row.passcode.clone(), payout_sats, &row.owner_address, network)
            .map_err(|e| StoreError::InvalidData(format!("faucet {}: {e}", row.id)))?;

        Ok(FaucetInfo {
            id: row.id,
            network,
            address: row.address.clone(),
            token_address: row.token_address.clone(),
            params,
            owner_address: row.owner_address.clone(),
            claim_count: i32_to_count(row.claim_count, "claim_count")?,
            max_claim_count: row
                .max_claim_count
                .map(|v| i32_to_count(v, "max_claim_count"))
                .transpose()?,
            balance_sats: i64_to_sats(row.balance_sats, "balance_sats")?,
            created_at: row.created_at.clone(),
            updated_at: row.updated_at.clone(),
        })
    }
}

impl TryFrom<&ClaimRow> for ClaimInfo {
    type Error = StoreError;

    fn try_from(row: &ClaimRow) -> std::result::Result<Self, Self::Error> {
        Ok(ClaimInfo {
            id: row.id,
            faucet_id: row.faucet_id,
            network: parse_network(&row.network)?,
            txid: row.txid.clone(),
            recipient: row.recipient.clone(),
            satoshis: i64_to_sats(row.satoshis, "satoshis")?,
            ip: row.ip.clone(),
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

// --- Store types -> new rows ---

pub fn new_faucet_row(
    compiled: &CompiledFaucet,
    network: Network,
    max_claim_count: Option<u32>,
) -> std::result::Result<NewFaucetRow, StoreError> {
    let params = compiled.params();
    let max_claim_count = max_claim_count
        .map(|v| {
            i32::try_from(v)
                .map_err(|_| StoreError::InvalidData(format!("max_claim_count: {v} out of range")))
        })
        .transpose()?;

    Ok(NewFaucetRow {
        network: network.as_str().to_string(),
        address: compiled.address(network).encode(),
        token_address: compiled.token_address(network).encode(),
        passcode: params.passcode.clone(),
        payout_sats: sats_to_i64(params.payout_sats, "payout_sats")?,
        owner_address: params.owner_address(network).encode(),
        max_claim_count,
    })
}

pub fn new_claim_row(claim: &NewClaim) -> std::result::Result<NewClaimRow, StoreError> {
    Ok(NewClaimRow {
        faucet_id: claim.faucet_id,
        network: claim.network.as_str().to_string(),
        txid: claim.txid.clone(),
        recipient: claim.recipient.clone(),
        satoshis: sats_to_i64(claim.satoshis, "satoshis")?,
        ip: claim.ip.clone(),
        created_at: format_timestamp(&claim.created_at),
    })
}
