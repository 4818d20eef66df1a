//! Spendable outputs and the normalisation of loosely-typed UTXO JSON.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::credential::OwnerCredential;
use crate::error::{Error, Result};
use crate::token::{Capability, Category, Payload};

/// Transaction id in display (RPC) byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Txid(pub [u8; 32]);

impl Txid {
    /// Internal byte order, as serialized in an outpoint.
    pub fn wire_bytes(&self) -> [u8; 32] {
        let mut bytes = self.0;
        bytes.reverse();
        bytes
    }

    pub fn from_wire_bytes(mut bytes: [u8; 32]) -> Self {
        bytes.reverse();
        Txid(bytes)
    }
}

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for Txid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| Error::InvalidUtxo(format!("bad txid: {e}")))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::InvalidUtxo("txid must be 32 bytes".into()))?;
        Ok(Txid(bytes))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Outpoint {
    pub txid: Txid,
    pub vout: u32,
}

impl fmt::Display for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

/// An unspent output. A credential marks it as a P2PKH input signed by that key
/// rather than a contract input.
#[derive(Debug, Clone)]
pub struct Utxo {
    pub outpoint: Outpoint,
    pub value: u64,
    pub payload: Payload,
    pub credential: Option<OwnerCredential>,
}

impl Utxo {
    pub fn new(outpoint: Outpoint, value: u64) -> Self {
        Self {
            outpoint,
            value,
            payload: Payload::Plain,
            credential: None,
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_credential(mut self, credential: OwnerCredential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn has_token(&self) -> bool {
        self.payload.is_token()
    }
}

impl PartialEq for Utxo {
    fn eq(&self, other: &Self) -> bool {
        self.outpoint == other.outpoint
            && self.value == other.value
            && self.payload == other.payload
            && self.credential.as_ref().map(|c| c.public_key())
                == other.credential.as_ref().map(|c| c.public_key())
    }
}

impl Eq for Utxo {}

/// A number that may arrive as a JSON number or a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountRepr {
    Number(u64),
    Text(String),
}

impl AmountRepr {
    pub fn to_u64(&self) -> Result<u64> {
        match self {
            AmountRepr::Number(n) => Ok(*n),
            AmountRepr::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| Error::InvalidUtxo(format!("not an integer amount: {s:?}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNft {
    pub capability: Capability,
    #[serde(default)]
    pub commitment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawToken {
    pub category: String,
    #[serde(default = "zero_amount")]
    pub amount: AmountRepr,
    #[serde(default)]
    pub nft: Option<RawNft>,
}

fn zero_amount() -> AmountRepr {
    AmountRepr::Number(0)
}

impl RawToken {
    pub fn to_payload(&self) -> Result<Payload> {
        let category: Category = self.category.parse()?;
        let amount = self.amount.to_u64()?;
        match &self.nft {
            Some(nft) => {
                let commitment = hex::decode(&nft.commitment)
                    .map_err(|e| Error::InvalidUtxo(format!("bad NFT commitment: {e}")))?;
                Ok(Payload::NonFungible {
                    category,
                    amount,
                    capability: nft.capability,
                    commitment,
                })
            }
            None if amount == 0 => Err(Error::InvalidUtxo(format!(
                "token {category} carries neither an amount nor an NFT"
            ))),
            None => Ok(Payload::Fungible { category, amount }),
        }
    }
}

/// UTXO as reported by Fulcrum (`tx_hash`/`tx_pos`/`value`/`token_data`) or by
/// wallet-style JSON (`txid`/`vout`/`satoshis`/`token`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUtxo {
    #[serde(alias = "tx_hash")]
    pub txid: String,
    #[serde(alias = "tx_pos")]
    pub vout: u32,
    #[serde(alias = "value")]
    pub satoshis: AmountRepr,
    #[serde(default, alias = "token_data")]
    pub token: Option<RawToken>,
    #[serde(default)]
    pub height: Option<i64>,
}

impl RawUtxo {
    pub fn normalize(&self) -> Result<Utxo> {
        let payload = match &self.token {
            Some(token) => token.to_payload()?,
            None => Payload::Plain,
        };
        Ok(Utxo {
            outpoint: Outpoint {
                txid: self.txid.parse()?,
                vout: self.vout,
            },
            value: self.satoshis.to_u64()?,
            payload,
            credential: None,
        })
    }
}

/// Parse a JSON array of loosely-typed UTXOs.
pub fn parse_utxos(json: &serde_json::Value) -> Result<Vec<Utxo>> {
    let raw: Vec<RawUtxo> = serde_json::from_value(json.clone())
        .map_err(|e| Error::InvalidUtxo(format!("malformed UTXO list: {e}")))?;
    raw.iter().map(RawUtxo::normalize).collect()
}
