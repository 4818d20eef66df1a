use bitcoin::NetworkKind;
use bitcoin::hashes::{Hash as _, hash160};
use bitcoin::secp256k1::{Message, Secp256k1, SecretKey};

use crate::cashaddr::CashAddress;
use crate::error::{Error, Result};
use crate::network::Network;

/// `SIGHASH_ALL | SIGHASH_FORKID`
pub const SIGHASH_ALL_FORKID: u8 = 0x41;

/// Owner key used to authorize sweeps.
#[derive(Clone)]
pub struct OwnerCredential {
    secret: SecretKey,
    public_key: [u8; 33],
}

impl OwnerCredential {
    /// Decode a compressed-key WIF for `network`.
    pub fn from_wif(wif: &str, network: Network) -> Result<Self> {
        let key = bitcoin::PrivateKey::from_wif(wif.trim())
            .map_err(|e| Error::Credential(format!("invalid WIF: {e}")))?;
        if !key.compressed {
            return Err(Error::Credential(
                "uncompressed keys are not supported".into(),
            ));
        }
        let expected = if network.is_mainnet() {
            NetworkKind::Main
        } else {
            NetworkKind::Test
        };
        if key.network != expected {
            return Err(Error::Credential(format!("WIF is not a {network} key")));
        }
        Ok(Self::from_secret(key.inner))
    }

    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|e| Error::Credential(format!("invalid secret key: {e}")))?;
        Ok(Self::from_secret(secret))
    }

    fn from_secret(secret: SecretKey) -> Self {
        let secp = Secp256k1::signing_only();
        let public_key = secret.public_key(&secp).serialize();
        Self { secret, public_key }
    }

    /// Compressed SEC1 public key.
    pub fn public_key(&self) -> [u8; 33] {
        self.public_key
    }

    pub fn pubkey_hash(&self) -> [u8; 20] {
        hash160::Hash::hash(&self.public_key).to_byte_array()
    }

    pub fn p2pkh_address(&self, network: Network) -> CashAddress {
        CashAddress::p2pkh(network, self.pubkey_hash())
    }

    /// Low-R DER signature over `digest` with the sighash byte appended.
    /// At most 71 bytes.
    pub fn sign_digest(&self, digest: [u8; 32]) -> Vec<u8> {
        let secp = Secp256k1::signing_only();
        let message = Message::from_digest(digest);
        let signature = secp.sign_ecdsa_low_r(&message, &self.secret);
        let mut out = signature.serialize_der().to_vec();
        out.push(SIGHASH_ALL_FORKID);
        out
    }
}

impl std::fmt::Debug for OwnerCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnerCredential")
            .field("public_key", &hex::encode(self.public_key))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_one_has_known_pubkey() {
        let mut secret = [0u8; 32];
        secret[31] = 1;
        let cred = OwnerCredential::from_secret_bytes(&secret).unwrap();
        assert_eq!(
            hex::encode(cred.public_key()),
            "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
        assert_eq!(
            hex::encode(cred.pubkey_hash()),
            "751e76e8199196d454941c45d1b3a323f1433bd6"
        );
    }

    #[test]
    fn wif_network_is_checked() {
        // Compressed mainnet WIF for secret 1.
        let wif = "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn";
        let cred = OwnerCredential::from_wif(wif, Network::Mainnet).unwrap();
        assert_eq!(
            hex::encode(cred.pubkey_hash()),
            "751e76e8199196d454941c45d1b3a323f1433bd6"
        );
        assert!(matches!(
            OwnerCredential::from_wif(wif, Network::Testnet),
            Err(Error::Credential(_))
        ));
        assert!(OwnerCredential::from_wif("not-a-wif", Network::Mainnet).is_err());
    }

    #[test]
    fn test_wif_matches_fixture_key() {
        let cred = OwnerCredential::from_wif(crate::testing::OWNER_TEST_WIF, Network::Testnet)
            .unwrap();
        assert_eq!(
            cred.public_key(),
            crate::testing::owner_credential().public_key()
        );
    }

    #[test]
    fn signatures_fit_placeholder() {
        let cred = OwnerCredential::from_secret_bytes(&[7u8; 32]).unwrap();
        for i in 0..16u8 {
            let sig = cred.sign_digest([i; 32]);
            assert!(sig.len() <= 71);
            assert_eq!(*sig.last().unwrap(), SIGHASH_ALL_FORKID);
        }
    }

    #[test]
    fn debug_hides_secret() {
        let cred = OwnerCredential::from_secret_bytes(&[7u8; 32]).unwrap();
        let dbg = format!("{cred:?}");
        assert!(!dbg.contains(&hex::encode([7u8; 32])));
    }
}
