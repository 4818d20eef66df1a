use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sql_types::{Integer, Text};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use faucet_sdk::{CompiledFaucet, FaucetParams, Network};

use crate::conversions::{format_timestamp, new_claim_row, new_faucet_row, sats_to_i64};
use crate::error::StoreError;
use crate::models::{ClaimRow, FaucetRow};
use crate::schema::{claims, faucets};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// SQL expression for SQLite's `datetime('now')`.
const DATETIME_NOW: &str = "datetime('now')";

// --- Public types ---

#[derive(Debug, Clone)]
pub struct FaucetInfo {
    pub id: i32,
    pub network: Network,
    pub address: String,
    pub token_address: String,
    pub params: FaucetParams,
    pub owner_address: String,
    pub claim_count: u32,
    /// `None` means unlimited.
    pub max_claim_count: Option<u32>,
    /// Last balance seen on chain.
    pub balance_sats: u64,
    pub created_at: String,
    pub updated_at: String,
}

impl FaucetInfo {
    pub fn is_exhausted(&self) -> bool {
        self.max_claim_count
            .is_some_and(|max| self.claim_count >= max)
    }

    pub fn remaining_claims(&self) -> Option<u32> {
        self.max_claim_count
            .map(|max| max.saturating_sub(self.claim_count))
    }
}

#[derive(Debug, Clone)]
pub struct ClaimInfo {
    pub id: i32,
    pub faucet_id: i32,
    pub network: Network,
    pub txid: String,
    pub recipient: String,
    pub satoshis: u64,
    pub ip: Option<String>,
    pub created_at: NaiveDateTime,
}

/// A claim to record. The caller supplies the timestamp (UTC).
#[derive(Debug, Clone)]
pub struct NewClaim {
    pub faucet_id: i32,
    pub network: Network,
    pub txid: String,
    pub recipient: String,
    pub satoshis: u64,
    pub ip: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct FaucetFilter {
    pub network: Option<Network>,
    pub owner_address: Option<String>,
    /// Only faucets that still accept claims.
    pub claimable_only: bool,
    pub limit: Option<i64>,
}

// --- FaucetStore ---

/// Persistent storage for faucet contracts and the claims paid from them.
///
/// All methods take `&mut self` because Diesel's `SqliteConnection` requires
/// `&mut` for all operations, including reads.
pub struct FaucetStore {
    conn: SqliteConnection,
}

impl FaucetStore {
    /// Open (or create) a store at the given file path. Runs migrations automatically.
    pub fn open(path: &str) -> crate::Result<Self> {
        let conn = SqliteConnection::establish(path)?;
        Self::init(conn)
    }

    /// Open an in-memory store for tests.
    pub fn open_in_memory() -> crate::Result<Self> {
        let conn = SqliteConnection::establish(":memory:")?;
        Self::init(conn)
    }

    fn init(mut conn: SqliteConnection) -> crate::Result<Self> {
        diesel::sql_query("PRAGMA foreign_keys = ON").execute(&mut conn)?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        Ok(FaucetStore { conn })
    }

    // ==================== Faucets ====================

    /// Register a faucet. Compiles the contract to derive its addresses.
    /// If a faucet with the same address exists, returns its ID unchanged.
    pub fn insert_faucet(
        &mut self,
        params: &FaucetParams,
        network: Network,
        max_claim_count: Option<u32>,
    ) -> crate::Result<i32> {
        let compiled = CompiledFaucet::new(params.clone())?;
        let row = new_faucet_row(&compiled, network, max_claim_count)?;

        let existing: Option<i32> = faucets::table
            .filter(faucets::address.eq(&row.address))
            .select(faucets::id)
            .first(&mut self.conn)
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }

        diesel::insert_into(faucets::table)
            .values(&row)
            .execute(&mut self.conn)?;

        let row_id: i32 = diesel::select(diesel::dsl::sql::<Integer>("last_insert_rowid()"))
            .get_result(&mut self.conn)?;

        Ok(row_id)
    }

    pub fn get_faucet(&mut self, id: i32) -> crate::Result<Option<FaucetInfo>> {
        let row: Option<FaucetRow> = faucets::table
            .filter(faucets::id.eq(id))
            .first(&mut self.conn)
            .optional()?;

        row.as_ref().map(FaucetInfo::try_from).transpose()
    }

    pub fn get_faucet_by_address(&mut self, address: &str) -> crate::Result<Option<FaucetInfo>> {
        let row: Option<FaucetRow> = faucets::table
            .filter(
                faucets::address
                    .eq(address)
                    .or(faucets::token_address.eq(address)),
            )
            .first(&mut self.conn)
            .optional()?;

        row.as_ref().map(FaucetInfo::try_from).transpose()
    }

    pub fn list_faucets(&mut self, filter: &FaucetFilter) -> crate::Result<Vec<FaucetInfo>> {
        let mut query = faucets::table.order(faucets::id.asc()).into_boxed();

        if let Some(network) = filter.network {
            query = query.filter(faucets::network.eq(network.as_str()));
        }
        if let Some(ref owner) = filter.owner_address {
            query = query.filter(faucets::owner_address.eq(owner.clone()));
        }
        if filter.claimable_only {
            query = query.filter(
                faucets::max_claim_count
                    .is_null()
                    .or(faucets::claim_count.lt(faucets::max_claim_count.assume_not_null())),
            );
        }
        if let Some(lim) = filter.limit {
            query = query.limit(lim);
        }

        let rows: Vec<FaucetRow> = query.load(&mut self.conn)?;
        rows.iter().map(FaucetInfo::try_from).collect()
    }

    /// The oldest faucet on `network` with this passcode that still accepts claims.
    pub fn find_claimable(
        &mut self,
        network: Network,
        passcode: &str,
    ) -> crate::Result<Option<FaucetInfo>> {
        let row: Option<FaucetRow> = faucets::table
            .filter(faucets::network.eq(network.as_str()))
            .filter(faucets::passcode.eq(passcode))
            .filter(
                faucets::max_claim_count
                    .is_null()
                    .or(faucets::claim_count.lt(faucets::max_claim_count.assume_not_null())),
            )
            .order(faucets::id.asc())
            .first(&mut self.conn)
            .optional()?;

        row.as_ref().map(FaucetInfo::try_from).transpose()
    }

    pub fn update_balance(&mut self, faucet_id: i32, balance_sats: u64) -> crate::Result<()> {
        let updated = diesel::update(faucets::table.filter(faucets::id.eq(faucet_id)))
            .set((
                faucets::balance_sats.eq(sats_to_i64(balance_sats, "balance_sats")?),
                faucets::updated_at.eq(diesel::dsl::sql::<Text>(DATETIME_NOW)),
            ))
            .execute(&mut self.conn)?;

        if updated == 0 {
            return Err(StoreError::FaucetNotFound(faucet_id));
        }
        Ok(())
    }

    // ==================== Claims ====================

    /// Insert a claim and bump its faucet's claim count atomically. Returns the claim ID.
    /// Fails with `ClaimLimitReached` if the faucet has already hit its cap.
    pub fn record_claim(&mut self, claim: &NewClaim) -> crate::Result<i32> {
        let row = new_claim_row(claim)?;

        self.conn.transaction::<_, StoreError, _>(|conn| {
            let claimable = faucets::table.filter(faucets::id.eq(claim.faucet_id)).filter(
                faucets::max_claim_count
                    .is_null()
                    .or(faucets::claim_count.lt(faucets::max_claim_count.assume_not_null())),
            );
            let updated = diesel::update(claimable)
                .set((
                    faucets::claim_count.eq(faucets::claim_count + 1),
                    faucets::updated_at.eq(diesel::dsl::sql::<Text>(DATETIME_NOW)),
                ))
                .execute(conn)?;
            if updated == 0 {
                let exists: i64 = faucets::table
                    .filter(faucets::id.eq(claim.faucet_id))
                    .count()
                    .get_result(conn)?;
                return Err(if exists == 0 {
                    StoreError::FaucetNotFound(claim.faucet_id)
                } else {
                    StoreError::ClaimLimitReached(claim.faucet_id)
                });
            }

            diesel::insert_into(claims::table)
                .values(&row)
                .execute(conn)?;

            let row_id: i32 = diesel::select(diesel::dsl::sql::<Integer>("last_insert_rowid()"))
                .get_result(conn)?;
            Ok(row_id)
        })
    }

    /// Claims from `ip` at or after `since`, newest first.
    pub fn claims_by_ip_since(
        &mut self,
        ip: &str,
        since: NaiveDateTime,
    ) -> crate::Result<Vec<ClaimInfo>> {
        let rows: Vec<ClaimRow> = claims::table
            .filter(claims::ip.eq(ip))
            .filter(claims::created_at.ge(format_timestamp(&since)))
            .order((claims::created_at.desc(), claims::id.desc()))
            .load(&mut self.conn)?;

        rows.iter().map(ClaimInfo::try_from).collect()
    }

    /// Most recent claims across all faucets.
    pub fn recent_claims(&mut self, limit: i64) -> crate::Result<Vec<ClaimInfo>> {
        let rows: Vec<ClaimRow> = claims::table
            .order(claims::id.desc())
            .limit(limit)
            .load(&mut self.conn)?;

        rows.iter().map(ClaimInfo::try_from).collect()
    }

    pub fn claims_for_faucet(&mut self, faucet_id: i32) -> crate::Result<Vec<ClaimInfo>> {
        let rows: Vec<ClaimRow> = claims::table
            .filter(claims::faucet_id.eq(faucet_id))
            .order(claims::id.desc())
            .load(&mut self.conn)?;

        rows.iter().map(ClaimInfo::try_from).collect()
    }
}
