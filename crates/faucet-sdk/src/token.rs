//! CashTokens payloads carried by outputs and UTXOs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::script::{compact_size_len, write_compact_size, write_var_bytes};

/// Minimum value of an output without tokens.
pub const PLAIN_DUST: u64 = 546;
/// Minimum value of an output carrying tokens.
pub const TOKEN_DUST: u64 = 1000;

const TOKEN_PREFIX: u8 = 0xef;
const HAS_COMMITMENT: u8 = 0x40;
const HAS_NFT: u8 = 0x20;
const HAS_AMOUNT: u8 = 0x10;

/// NFT capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    #[default]
    None,
    Mutable,
    Minting,
}

impl Capability {
    fn bits(self) -> u8 {
        match self {
            Capability::None => 0x00,
            Capability::Mutable => 0x01,
            Capability::Minting => 0x02,
        }
    }
}

impl FromStr for Capability {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Capability::None),
            "mutable" => Ok(Capability::Mutable),
            "minting" => Ok(Capability::Minting),
            other => Err(Error::InvalidUtxo(format!("unknown NFT capability: {other}"))),
        }
    }
}

/// Token category id, stored in display (RPC) byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Category(pub [u8; 32]);

impl Category {
    /// The category as it appears inside a serialized token prefix.
    pub fn wire_bytes(&self) -> [u8; 32] {
        let mut bytes = self.0;
        bytes.reverse();
        bytes
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)
            .map_err(|e| Error::InvalidUtxo(format!("bad token category: {e}")))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::InvalidUtxo("token category must be 32 bytes".into()))?;
        Ok(Category(bytes))
    }
}

/// What an output carries besides satoshis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Payload {
    #[default]
    Plain,
    Fungible {
        category: Category,
        amount: u64,
    },
    NonFungible {
        category: Category,
        /// Fungible amount carried alongside the NFT; 0 when none.
        amount: u64,
        capability: Capability,
        commitment: Vec<u8>,
    },
}

impl Payload {
    pub fn is_token(&self) -> bool {
        !matches!(self, Payload::Plain)
    }

    pub fn category(&self) -> Option<&Category> {
        match self {
            Payload::Plain => None,
            Payload::Fungible { category, .. } | Payload::NonFungible { category, .. } => {
                Some(category)
            }
        }
    }

    /// Smallest value an output with this payload may hold.
    pub fn dust_floor(&self) -> u64 {
        if self.is_token() {
            TOKEN_DUST
        } else {
            PLAIN_DUST
        }
    }

    /// Serialized token prefix, empty for plain payloads.
    pub fn prefix(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Payload::Plain => {}
            Payload::Fungible { category, amount } => {
                out.push(TOKEN_PREFIX);
                out.extend_from_slice(&category.wire_bytes());
                out.push(HAS_AMOUNT);
                write_compact_size(&mut out, *amount);
            }
            Payload::NonFungible {
                category,
                amount,
                capability,
                commitment,
            } => {
                let mut bitfield = HAS_NFT | capability.bits();
                if !commitment.is_empty() {
                    bitfield |= HAS_COMMITMENT;
                }
                if *amount > 0 {
                    bitfield |= HAS_AMOUNT;
                }
                out.push(TOKEN_PREFIX);
                out.extend_from_slice(&category.wire_bytes());
                out.push(bitfield);
                if !commitment.is_empty() {
                    write_var_bytes(&mut out, commitment);
                }
                if *amount > 0 {
                    write_compact_size(&mut out, *amount);
                }
            }
        }
        out
    }

    /// Length of [`Payload::prefix`] without building it.
    pub fn prefix_len(&self) -> usize {
        match self {
            Payload::Plain => 0,
            Payload::Fungible { amount, .. } => 1 + 32 + 1 + compact_size_len(*amount),
            Payload::NonFungible {
                amount, commitment, ..
            } => {
                let mut len = 1 + 32 + 1;
                if !commitment.is_empty() {
                    len += compact_size_len(commitment.len() as u64) + commitment.len();
                }
                if *amount > 0 {
                    len += compact_size_len(*amount);
                }
                len
            }
        }
    }
}
