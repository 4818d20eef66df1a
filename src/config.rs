use std::fs;
use std::path::{Path, PathBuf};

use faucet_sdk::{DEFAULT_FEE_RATE, Network};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

pub const CONFIG_FILE: &str = "faucet_config.json";
const DATABASE_FILE: &str = "faucet.db";

/// One claim per IP per day.
pub const DEFAULT_CLAIM_COOLDOWN_SECS: i64 = 24 * 60 * 60;

/// Highest accepted fee rate, in satoshis per byte.
pub const MAX_FEE_RATE: u64 = 1000;

/// Operator configuration, persisted as `faucet_config.json` in the data directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaucetConfig {
    pub network: Network,
    /// Fulcrum endpoint; the network's public server when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub electrum_url: Option<String>,
    /// Relative paths resolve against the data directory.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default = "default_claim_cooldown_secs")]
    pub claim_cooldown_secs: i64,
    /// Sweep fee rate in sats per byte.
    #[serde(default = "default_fee_rate")]
    pub fee_rate: u64,
    /// Claim cap applied to newly created faucets; `None` means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_claim_count: Option<u32>,
}

fn default_database_path() -> PathBuf {
    PathBuf::from(DATABASE_FILE)
}

fn default_claim_cooldown_secs() -> i64 {
    DEFAULT_CLAIM_COOLDOWN_SECS
}

fn default_fee_rate() -> u64 {
    DEFAULT_FEE_RATE
}

impl FaucetConfig {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            electrum_url: None,
            database_path: default_database_path(),
            claim_cooldown_secs: DEFAULT_CLAIM_COOLDOWN_SECS,
            fee_rate: DEFAULT_FEE_RATE,
            max_claim_count: None,
        }
    }

    pub fn electrum_url(&self) -> &str {
        self.electrum_url
            .as_deref()
            .unwrap_or_else(|| self.network.default_electrum_url())
    }

    pub fn database_path_in(&self, data_dir: &Path) -> PathBuf {
        if self.database_path.is_absolute() {
            self.database_path.clone()
        } else {
            data_dir.join(&self.database_path)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.claim_cooldown_secs < 0 {
            return Err(ServiceError::Config(format!(
                "claimCooldownSecs must be >= 0, got {}",
                self.claim_cooldown_secs
            )));
        }
        if self.fee_rate == 0 || self.fee_rate > MAX_FEE_RATE {
            return Err(ServiceError::Config(format!(
                "feeRate must be in 1..={MAX_FEE_RATE}, got {}",
                self.fee_rate
            )));
        }
        Ok(())
    }

    /// Read the config from `data_dir`. A missing file is `Ok(None)`.
    pub fn load(data_dir: &Path) -> Result<Option<Self>> {
        let path = data_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)
            .map_err(|e| ServiceError::Config(format!("{}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ServiceError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(Some(config))
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        fs::create_dir_all(data_dir)
            .map_err(|e| ServiceError::Config(format!("{}: {e}", data_dir.display())))?;
        let path = data_dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ServiceError::Config(e.to_string()))?;
        fs::write(&path, json)
            .map_err(|e| ServiceError::Config(format!("{}: {e}", path.display())))
    }

    /// Load the saved config, or write a default one for `network` on first launch.
    pub fn load_or_init(data_dir: &Path, network: Network) -> Result<Self> {
        if let Some(config) = Self::load(data_dir)? {
            return Ok(config);
        }
        let config = Self::new(network);
        config.save(data_dir)?;
        log::info!("wrote default {CONFIG_FILE} for {network}");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_file_fills_defaults() {
        let config: FaucetConfig = serde_json::from_str(r#"{"network": "chipnet"}"#).unwrap();
        assert_eq!(config, FaucetConfig::new(Network::Testnet));
        assert_eq!(config.claim_cooldown_secs, 86_400);
        assert_eq!(config.electrum_url(), Network::Testnet.default_electrum_url());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = FaucetConfig::new(Network::Regtest);
        config.electrum_url = Some("tcp://127.0.0.1:60401".into());
        config.max_claim_count = Some(5);
        config.save(dir.path()).unwrap();

        let loaded = FaucetConfig::load(dir.path()).unwrap().unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.electrum_url(), "tcp://127.0.0.1:60401");
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FaucetConfig::load(dir.path()).unwrap().is_none());

        let config = FaucetConfig::load_or_init(dir.path(), Network::Mainnet).unwrap();
        assert_eq!(config.network, Network::Mainnet);
        assert!(dir.path().join(CONFIG_FILE).exists());
    }

    #[test]
    fn rejects_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"network": "mainnet", "feeRate": 0}"#,
        )
        .unwrap();
        assert!(matches!(
            FaucetConfig::load(dir.path()),
            Err(ServiceError::Config(_))
        ));

        let mut config = FaucetConfig::new(Network::Testnet);
        config.fee_rate = MAX_FEE_RATE;
        assert!(config.validate().is_ok());
        config.fee_rate = MAX_FEE_RATE + 1;
        assert!(matches!(config.validate(), Err(ServiceError::Config(_))));

        fs::write(dir.path().join(CONFIG_FILE), "not json").unwrap();
        assert!(FaucetConfig::load(dir.path()).is_err());
    }

    #[test]
    fn database_path_resolves_against_data_dir() {
        let config = FaucetConfig::new(Network::Mainnet);
        let dir = Path::new("/var/lib/faucet");
        assert_eq!(config.database_path_in(dir), dir.join("faucet.db"));
    }
}
