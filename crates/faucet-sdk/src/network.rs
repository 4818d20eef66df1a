use serde::{Deserialize, Serialize};

/// Network variants for Bitcoin Cash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[serde(rename = "chipnet", alias = "testnet")]
    Testnet,
    Regtest,
}

impl Network {
    pub fn is_mainnet(self) -> bool {
        matches!(self, Network::Mainnet)
    }

    /// Human-readable part of CashAddr addresses on this network.
    pub fn cashaddr_prefix(self) -> &'static str {
        match self {
            Network::Mainnet => "bitcoincash",
            Network::Testnet => "bchtest",
            Network::Regtest => "bchreg",
        }
    }

    pub fn from_cashaddr_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "bitcoincash" => Some(Network::Mainnet),
            "bchtest" => Some(Network::Testnet),
            "bchreg" => Some(Network::Regtest),
            _ => None,
        }
    }

    /// Public Fulcrum endpoint used when no electrum URL is configured.
    pub fn default_electrum_url(self) -> &'static str {
        match self {
            Network::Mainnet => "ssl://bch.imaginary.cash:50002",
            Network::Testnet => "ssl://chipnet.imaginary.cash:50002",
            Network::Regtest => "tcp://localhost:50001",
        }
    }

    /// Block explorer link for a transaction, if the network has a public explorer.
    pub fn explorer_tx_url(self, txid: &str) -> Option<String> {
        match self {
            Network::Mainnet => Some(format!("https://explorer.bch.ninja/tx/{txid}")),
            Network::Testnet => Some(format!("https://chipnet.bch.ninja/tx/{txid}")),
            Network::Regtest => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "chipnet",
            Network::Regtest => "regtest",
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "bitcoincash" => Ok(Network::Mainnet),
            "testnet" | "chipnet" | "bchtest" => Ok(Network::Testnet),
            "regtest" | "bchreg" => Ok(Network::Regtest),
            _ => Err(format!("invalid network: {}", s)),
        }
    }
}
