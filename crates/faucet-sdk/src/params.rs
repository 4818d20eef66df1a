use serde::{Deserialize, Serialize};

use crate::cashaddr::{AddressType, CashAddress};
use crate::error::{Error, Result};
use crate::network::Network;
use crate::script::encode_script_number;
use crate::token::PLAIN_DUST;

/// Constructor parameters of a faucet contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FaucetParams {
    /// Satoshis paid to each claimant.
    pub payout_sats: u64,
    /// HASH160 of the owner's public key.
    pub owner_pkh: [u8; 20],
    /// Secret a claimant must present, as UTF-8.
    pub passcode: String,
}

impl FaucetParams {
    /// Build parameters from the owner's CashAddr, which must be a P2PKH address on
    /// `network`.
    pub fn new(
        passcode: impl Into<String>,
        payout_sats: u64,
        owner_address: &str,
        network: Network,
    ) -> Result<Self> {
        let owner = CashAddress::decode_for(owner_address, network)?;
        if !matches!(
            owner.kind(),
            AddressType::P2pkh | AddressType::P2pkhWithTokens
        ) {
            return Err(Error::InvalidParams(format!(
                "owner address must be P2PKH: {owner_address}"
            )));
        }
        let owner_pkh: [u8; 20] = owner
            .payload()
            .try_into()
            .map_err(|_| Error::InvalidParams("owner hash must be 20 bytes".into()))?;

        let params = Self {
            payout_sats,
            owner_pkh,
            passcode: passcode.into(),
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.payout_sats < PLAIN_DUST {
            return Err(Error::InvalidParams(format!(
                "payout of {} sats is below the dust limit of {PLAIN_DUST}",
                self.payout_sats
            )));
        }
        if i64::try_from(self.payout_sats).is_err() {
            return Err(Error::InvalidParams("payout does not fit a script number".into()));
        }
        Ok(())
    }

    pub fn owner_address(&self, network: Network) -> CashAddress {
        CashAddress::p2pkh(network, self.owner_pkh)
    }

    /// Encoded constructor arguments in declaration order.
    pub(crate) fn constructor_args(&self) -> Vec<Vec<u8>> {
        vec![
            encode_script_number(self.payout_sats as i64),
            self.owner_pkh.to_vec(),
            self.passcode.as_bytes().to_vec(),
        ]
    }
}

/// Per-call options. The network is never process-wide state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaucetOptions {
    pub network: Network,
}

impl Default for FaucetOptions {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
        }
    }
}
