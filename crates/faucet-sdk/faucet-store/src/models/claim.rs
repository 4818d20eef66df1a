use diesel::prelude::*;

use crate::schema::claims;

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = claims)]
pub struct ClaimRow {
    pub id: i32,
    pub faucet_id: i32,
    pub network: String,
    pub txid: String,
    pub recipient: String,
    pub satoshis: i64,
    pub ip: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = claims)]
pub struct NewClaimRow {
    pub faucet_id: i32,
    pub network: String,
    pub txid: String,
    pub recipient: String,
    pub satoshis: i64,
    pub ip: Option<String>,
    pub created_at: String,
}
