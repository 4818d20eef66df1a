use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utxo::{Txid, Utxo, parse_utxos};

/// Confirmed and mempool balance of a locking script, in satoshis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub confirmed: u64,
    /// Net mempool delta; negative while spends are unconfirmed.
    pub unconfirmed: i64,
}

impl Balance {
    pub fn total(&self) -> u64 {
        self.confirmed.saturating_add_signed(self.unconfirmed)
    }
}

/// Backend for interacting with the Bitcoin Cash chain.
pub trait ChainBackend {
    /// Unspent outputs locked by `locking_script`, including unconfirmed ones.
    fn list_unspent(&self, locking_script: &[u8]) -> Result<Vec<Utxo>>;

    fn get_balance(&self, locking_script: &[u8]) -> Result<Balance>;

    /// Broadcast a raw transaction and return its txid.
    fn broadcast(&self, raw_hex: &str) -> Result<Txid>;
}

impl<B: ChainBackend + ?Sized> ChainBackend for std::sync::Arc<B> {
    fn list_unspent(&self, locking_script: &[u8]) -> Result<Vec<Utxo>> {
        (**self).list_unspent(locking_script)
    }

    fn get_balance(&self, locking_script: &[u8]) -> Result<Balance> {
        (**self).get_balance(locking_script)
    }

    fn broadcast(&self, raw_hex: &str) -> Result<Txid> {
        (**self).broadcast(raw_hex)
    }
}

/// Electrum script hash: SHA256 of the locking script, byte-reversed, hex encoded.
pub fn electrum_script_hash(locking_script: &[u8]) -> String {
    use sha2::{Digest, Sha256};

    let mut hash = Sha256::digest(locking_script).to_vec();
    hash.reverse();
    hex::encode(hash)
}

/// Fulcrum-backed chain access over the Electrum protocol.
pub struct ElectrumBackend {
    electrum_url: String,
}

impl ElectrumBackend {
    pub fn new(electrum_url: &str) -> Self {
        Self {
            electrum_url: electrum_url.to_string(),
        }
    }

    pub fn electrum_url(&self) -> &str {
        &self.electrum_url
    }

    fn call(&self, method: &str, param: String) -> Result<serde_json::Value> {
        use electrum_client::ElectrumApi;

        let client = electrum_client::Client::new(&self.electrum_url)
            .map_err(|e| Error::Electrum(e.to_string()))?;
        client
            .raw_call(method, [electrum_client::Param::String(param)])
            .map_err(|e| Error::Electrum(format!("{method}: {e}")))
    }
}

impl ChainBackend for ElectrumBackend {
    fn list_unspent(&self, locking_script: &[u8]) -> Result<Vec<Utxo>> {
        let resp = self.call(
            "blockchain.scripthash.listunspent",
            electrum_script_hash(locking_script),
        )?;
        if !resp.is_array() {
            return Err(Error::Query("expected array response".into()));
        }
        let utxos = parse_utxos(&resp)?;
        log::debug!("{} unspent outputs at {}", utxos.len(), hex::encode(locking_script));
        Ok(utxos)
    }

    fn get_balance(&self, locking_script: &[u8]) -> Result<Balance> {
        let resp = self.call(
            "blockchain.scripthash.get_balance",
            electrum_script_hash(locking_script),
        )?;
        serde_json::from_value(resp).map_err(|e| Error::Query(format!("bad balance: {e}")))
    }

    fn broadcast(&self, raw_hex: &str) -> Result<Txid> {
        let resp = self
            .call("blockchain.transaction.broadcast", raw_hex.to_string())
            .map_err(|e| Error::Broadcast(e.to_string()))?;
        let txid = resp
            .as_str()
            .ok_or_else(|| Error::Broadcast(format!("unexpected response: {resp}")))?;
        log::info!("broadcast {txid}");
        txid.parse()
    }
}
