use diesel::prelude::*;

use crate::schema::faucets;

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = faucets)]
pub struct FaucetRow {
    pub id: i32,
    pub network: String,
    /// Cached: re-derivable via `CompiledFaucet::new(params)?.address(network)`.
    pub address: String,
    pub token_address: String,
    pub passcode: String,
    pub payout_sats: i64,
    pub owner_address: String,
    pub claim_count: i32,
    pub max_claim_count: Option<i32>,
    pub balance_sats: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = faucets)]
pub struct NewFaucetRow {
    pub network: String,
    pub address: String,
    pub token_address: String,
    pub passcode: String,
    pub payout_sats: i64,
    pub owner_address: String,
    pub max_claim_count: Option<i32>,
}
