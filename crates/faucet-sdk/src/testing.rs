//! Test utilities: an in-memory chain backend and contract fixtures.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::chain::{Balance, ChainBackend};
use crate::credential::OwnerCredential;
use crate::error::{Error, Result};
use crate::network::Network;
use crate::params::FaucetParams;
use crate::script::hash256;
use crate::token::{Category, Payload};
use crate::utxo::{Outpoint, Txid, Utxo};

/// Chain backend holding UTXOs per locking script and recording broadcasts.
#[derive(Default)]
pub struct MemoryBackend {
    utxos: Mutex<HashMap<Vec<u8>, Vec<Utxo>>>,
    broadcasts: Mutex<Vec<String>>,
    reject_broadcasts: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose broadcasts always fail.
    pub fn rejecting() -> Self {
        Self {
            reject_broadcasts: true,
            ..Self::default()
        }
    }

    pub fn fund(&self, locking_script: &[u8], utxo: Utxo) {
        self.utxos
            .lock()
            .expect("utxo lock")
            .entry(locking_script.to_vec())
            .or_default()
            .push(utxo);
    }

    /// Raw hex of every accepted broadcast, in order.
    pub fn broadcasts(&self) -> Vec<String> {
        self.broadcasts.lock().expect("broadcast lock").clone()
    }
}

impl ChainBackend for MemoryBackend {
    fn list_unspent(&self, locking_script: &[u8]) -> Result<Vec<Utxo>> {
        Ok(self
            .utxos
            .lock()
            .expect("utxo lock")
            .get(locking_script)
            .cloned()
            .unwrap_or_default())
    }

    fn get_balance(&self, locking_script: &[u8]) -> Result<Balance> {
        let confirmed = self
            .list_unspent(locking_script)?
            .iter()
            .map(|u| u.value)
            .sum();
        Ok(Balance {
            confirmed,
            unconfirmed: 0,
        })
    }

    fn broadcast(&self, raw_hex: &str) -> Result<Txid> {
        if self.reject_broadcasts {
            return Err(Error::Broadcast("rejected by test backend".into()));
        }
        let bytes = hex::decode(raw_hex).map_err(|e| Error::Broadcast(e.to_string()))?;
        self.broadcasts
            .lock()
            .expect("broadcast lock")
            .push(raw_hex.to_string());
        Ok(Txid::from_wire_bytes(hash256(&bytes)))
    }
}

/// Testnet WIF of [`owner_credential`].
pub const OWNER_TEST_WIF: &str = "cPoVxi18CnxHUQjYNpjRM3RYUVFA61wuTNQez7BtRKkfp9Fw6RTW";

/// Deterministic owner key.
pub fn owner_credential() -> OwnerCredential {
    OwnerCredential::from_secret_bytes(&[0x42; 32]).expect("valid test key")
}

/// Faucet parameters owned by [`owner_credential`].
pub fn faucet_params(passcode: &str, payout_sats: u64) -> FaucetParams {
    FaucetParams {
        payout_sats,
        owner_pkh: owner_credential().pubkey_hash(),
        passcode: passcode.to_string(),
    }
}

/// Owner address on `network`.
pub fn owner_address(network: Network) -> String {
    owner_credential().p2pkh_address(network).encode()
}

/// A plain UTXO with a txid derived from `seed`.
pub fn plain_utxo(seed: u8, value: u64) -> Utxo {
    Utxo::new(
        Outpoint {
            txid: Txid([seed; 32]),
            vout: u32::from(seed),
        },
        value,
    )
}

/// A fungible-token UTXO with a category derived from `seed`.
pub fn token_utxo(seed: u8, value: u64, amount: u64) -> Utxo {
    plain_utxo(seed, value).with_payload(Payload::Fungible {
        category: Category([seed; 32]),
        amount,
    })
}
