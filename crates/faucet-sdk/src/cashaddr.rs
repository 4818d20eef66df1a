//! CashAddr address codec, including the CashTokens token-aware address types.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::network::Network;
use crate::script::{p2pkh_locking_script, p2sh_locking_script};

const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const CHECKSUM_LEN: usize = 8;

/// Address type encoded in the version byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressType {
    P2pkh,
    P2sh,
    P2pkhWithTokens,
    P2shWithTokens,
}

impl AddressType {
    fn type_bits(self) -> u8 {
        match self {
            AddressType::P2pkh => 0,
            AddressType::P2sh => 1,
            AddressType::P2pkhWithTokens => 2,
            AddressType::P2shWithTokens => 3,
        }
    }

    fn from_type_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(AddressType::P2pkh),
            1 => Some(AddressType::P2sh),
            2 => Some(AddressType::P2pkhWithTokens),
            3 => Some(AddressType::P2shWithTokens),
            _ => None,
        }
    }

    pub fn is_token_aware(self) -> bool {
        matches!(
            self,
            AddressType::P2pkhWithTokens | AddressType::P2shWithTokens
        )
    }

    pub fn is_p2sh(self) -> bool {
        matches!(self, AddressType::P2sh | AddressType::P2shWithTokens)
    }

    /// The token-aware variant of the same key/script type.
    pub fn with_tokens(self) -> Self {
        match self {
            AddressType::P2pkh | AddressType::P2pkhWithTokens => AddressType::P2pkhWithTokens,
            AddressType::P2sh | AddressType::P2shWithTokens => AddressType::P2shWithTokens,
        }
    }
}

fn size_bits(len: usize) -> Option<u8> {
    match len {
        20 => Some(0),
        24 => Some(1),
        28 => Some(2),
        32 => Some(3),
        40 => Some(4),
        48 => Some(5),
        56 => Some(6),
        64 => Some(7),
        _ => None,
    }
}

fn size_from_bits(bits: u8) -> usize {
    [20, 24, 28, 32, 40, 48, 56, 64][(bits & 0x07) as usize]
}

/// A decoded CashAddr address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CashAddress {
    network: Network,
    kind: AddressType,
    payload: Vec<u8>,
}

impl CashAddress {
    pub fn new(network: Network, kind: AddressType, payload: Vec<u8>) -> Result<Self> {
        if size_bits(payload.len()).is_none() {
            return Err(Error::InvalidAddress(format!(
                "unsupported hash length {}",
                payload.len()
            )));
        }
        if !kind.is_p2sh() && payload.len() != 20 {
            return Err(Error::InvalidAddress(
                "P2PKH payload must be 20 bytes".into(),
            ));
        }
        Ok(Self {
            network,
            kind,
            payload,
        })
    }

    /// P2PKH address for a 20-byte public key hash.
    pub fn p2pkh(network: Network, pubkey_hash: [u8; 20]) -> Self {
        Self {
            network,
            kind: AddressType::P2pkh,
            payload: pubkey_hash.to_vec(),
        }
    }

    /// P2SH32 address for a 32-byte script hash.
    pub fn p2sh32(network: Network, script_hash: [u8; 32]) -> Self {
        Self {
            network,
            kind: AddressType::P2sh,
            payload: script_hash.to_vec(),
        }
    }

    /// Decode an address that must carry its network prefix.
    pub fn decode(address: &str) -> Result<Self> {
        let (prefix, _) = address
            .rsplit_once(':')
            .ok_or_else(|| Error::InvalidAddress(format!("missing prefix: {address}")))?;
        let network = Network::from_cashaddr_prefix(&prefix.to_lowercase())
            .ok_or_else(|| Error::InvalidAddress(format!("unknown prefix: {prefix}")))?;
        Self::decode_for(address, network)
    }

    /// Decode an address expected on `network`. The prefix may be omitted; if present it
    /// must match the network.
    pub fn decode_for(address: &str, network: Network) -> Result<Self> {
        let has_lower = address.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = address.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper {
            return Err(Error::InvalidAddress("mixed case".into()));
        }
        let address = address.to_lowercase();

        let payload_part = match address.rsplit_once(':') {
            Some((prefix, payload)) => {
                let found = Network::from_cashaddr_prefix(prefix)
                    .ok_or_else(|| Error::InvalidAddress(format!("unknown prefix: {prefix}")))?;
                if found != network {
                    return Err(Error::NetworkMismatch {
                        expected: network,
                        found,
                    });
                }
                payload
            }
            None => address.as_str(),
        };

        let values = payload_part
            .bytes()
            .map(|c| {
                CHARSET
                    .iter()
                    .position(|&x| x == c)
                    .map(|p| p as u8)
                    .ok_or_else(|| Error::InvalidAddress(format!("invalid character {:?}", c as char)))
            })
            .collect::<Result<Vec<u8>>>()?;

        if values.len() <= CHECKSUM_LEN {
            return Err(Error::InvalidAddress("too short".into()));
        }
        if !verify_checksum(network.cashaddr_prefix(), &values) {
            return Err(Error::InvalidAddress("bad checksum".into()));
        }

        let data = convert_bits(&values[..values.len() - CHECKSUM_LEN], 5, 8, false)
            .ok_or_else(|| Error::InvalidAddress("invalid padding".into()))?;
        let (&version, payload) = data
            .split_first()
            .ok_or_else(|| Error::InvalidAddress("empty payload".into()))?;

        if version & 0x80 != 0 {
            return Err(Error::InvalidAddress("reserved version bit set".into()));
        }
        let kind = AddressType::from_type_bits((version >> 3) & 0x0f).ok_or_else(|| {
            Error::InvalidAddress(format!("unknown address type in version {version:#04x}"))
        })?;
        if payload.len() != size_from_bits(version) {
            return Err(Error::InvalidAddress(format!(
                "payload length {} does not match version {version:#04x}",
                payload.len()
            )));
        }

        Self::new(network, kind, payload.to_vec())
    }

    pub fn encode(&self) -> String {
        let prefix = self.network.cashaddr_prefix();
        // `new` guarantees a supported payload length.
        let size = size_bits(self.payload.len()).unwrap_or(0);
        let version = (self.kind.type_bits() << 3) | size;

        let mut data = Vec::with_capacity(self.payload.len() + 1);
        data.push(version);
        data.extend_from_slice(&self.payload);
        let mut values = convert_bits(&data, 8, 5, true).unwrap_or_default();
        let checksum = create_checksum(prefix, &values);
        values.extend_from_slice(&checksum);

        let mut out = String::with_capacity(prefix.len() + 1 + values.len());
        out.push_str(prefix);
        out.push(':');
        out.extend(values.iter().map(|&v| CHARSET[v as usize] as char));
        out
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn kind(&self) -> AddressType {
        self.kind
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Same key/script hash, token-aware address type.
    pub fn to_token_aware(&self) -> CashAddress {
        CashAddress {
            network: self.network,
            kind: self.kind.with_tokens(),
            payload: self.payload.clone(),
        }
    }

    /// The locking bytecode paid by this address. Token awareness does not change it.
    pub fn locking_script(&self) -> Vec<u8> {
        if self.kind.is_p2sh() {
            p2sh_locking_script(&self.payload)
        } else {
            p2pkh_locking_script(&self.payload)
        }
    }
}

impl fmt::Display for CashAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for CashAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}

/// Upgrade an address string to its token-aware form. Token-aware input is returned as is.
pub fn to_token_address(address: &str) -> Result<String> {
    let decoded = CashAddress::decode(address)?;
    if decoded.kind().is_token_aware() {
        return Ok(address.to_string());
    }
    Ok(decoded.to_token_aware().encode())
}

fn polymod(values: impl IntoIterator<Item = u8>) -> u64 {
    let mut c: u64 = 1;
    for d in values {
        let c0 = (c >> 35) as u8;
        c = ((c & 0x07_ffff_ffff) << 5) ^ u64::from(d);
        if c0 & 0x01 != 0 {
            c ^= 0x98_f2bc_8e61;
        }
        if c0 & 0x02 != 0 {
            c ^= 0x79_b76d_99e2;
        }
        if c0 & 0x04 != 0 {
            c ^= 0xf3_3e5f_b3c4;
        }
        if c0 & 0x08 != 0 {
            c ^= 0xae_2eab_e2a8;
        }
        if c0 & 0x10 != 0 {
            c ^= 0x1e_4f43_e470;
        }
    }
    c ^ 1
}

fn prefix_values(prefix: &str) -> impl Iterator<Item = u8> + '_ {
    prefix.bytes().map(|b| b & 0x1f).chain(std::iter::once(0))
}

fn create_checksum(prefix: &str, values: &[u8]) -> [u8; CHECKSUM_LEN] {
    let modulo = polymod(
        prefix_values(prefix)
            .chain(values.iter().copied())
            .chain([0u8; CHECKSUM_LEN]),
    );
    let mut out = [0u8; CHECKSUM_LEN];
    for (i, v) in out.iter_mut().enumerate() {
        *v = ((modulo >> (5 * (7 - i))) & 0x1f) as u8;
    }
    out
}

fn verify_checksum(prefix: &str, values: &[u8]) -> bool {
    polymod(prefix_values(prefix).chain(values.iter().copied())) == 0
}

fn convert_bits(data: &[u8], from: u32, to: u32, pad: bool) -> Option<Vec<u8>> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let max_value = (1u32 << to) - 1;
    let mut out = Vec::with_capacity(data.len() * from as usize / to as usize + 1);
    for &value in data {
        let value = u32::from(value);
        if value >> from != 0 {
            return None;
        }
        acc = (acc << from) | value;
        bits += from;
        while bits >= to {
            bits -= to;
            out.push(((acc >> bits) & max_value) as u8);
        }
    }
    if pad {
        if bits > 0 {
            out.push(((acc << (to - bits)) & max_value) as u8);
        }
    } else if bits >= from || ((acc << (to - bits)) & max_value) != 0 {
        return None;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PKH: &str = "76a04053bda0a88bda5177b86a15c3b29f559873";

    #[test]
    fn decodes_known_p2pkh() {
        let addr =
            CashAddress::decode("bitcoincash:qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a").unwrap();
        assert_eq!(addr.network(), Network::Mainnet);
        assert_eq!(addr.kind(), AddressType::P2pkh);
        assert_eq!(hex::encode(addr.payload()), PKH);
    }

    #[test]
    fn encodes_spec_vectors() {
        let payload = hex::decode("f5bf48b397dae70be82b3cca4793f8eb2b6cdac9").unwrap();
        let p2pkh = CashAddress::new(Network::Mainnet, AddressType::P2pkh, payload.clone()).unwrap();
        assert_eq!(
            p2pkh.encode(),
            "bitcoincash:qr6m7j9njldwwzlg9v7v53unlr4jkmx6eylep8ekg2"
        );
        let p2sh = CashAddress::new(Network::Testnet, AddressType::P2sh, payload).unwrap();
        assert_eq!(
            p2sh.encode(),
            "bchtest:pr6m7j9njldwwzlg9v7v53unlr4jkmx6eyvwc0uz5t"
        );
    }

    #[test]
    fn prefixless_and_uppercase_input() {
        let addr = CashAddress::decode_for(
            "QPM2QSZNHKS23Z7629MMS6S4CWEF74VCWVY22GDX6A",
            Network::Mainnet,
        )
        .unwrap();
        assert_eq!(hex::encode(addr.payload()), PKH);
    }

    #[test]
    fn rejects_bad_checksum_and_mixed_case() {
        assert!(
            CashAddress::decode("bitcoincash:qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6b").is_err()
        );
        assert!(
            CashAddress::decode("bitcoincash:Qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a").is_err()
        );
    }

    #[test]
    fn rejects_wrong_network() {
        let err = CashAddress::decode_for(
            "bitcoincash:qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a",
            Network::Testnet,
        )
        .unwrap_err();
        assert!(matches!(err, Error::NetworkMismatch { .. }));
    }

    #[test]
    fn token_upgrade_keeps_payload() {
        let plain = "bitcoincash:qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a";
        let token = to_token_address(plain).unwrap();
        assert!(token.starts_with("bitcoincash:z"));

        let decoded = CashAddress::decode(&token).unwrap();
        assert_eq!(decoded.kind(), AddressType::P2pkhWithTokens);
        assert_eq!(hex::encode(decoded.payload()), PKH);
        // Already token-aware: unchanged.
        assert_eq!(to_token_address(&token).unwrap(), token);
        // Token awareness does not change the locking bytecode.
        assert_eq!(
            decoded.locking_script(),
            CashAddress::decode(plain).unwrap().locking_script()
        );
    }

    #[test]
    fn p2sh32_roundtrip() {
        let addr = CashAddress::new(Network::Testnet, AddressType::P2sh, vec![0x5a; 32]).unwrap();
        let encoded = addr.encode();
        assert!(encoded.starts_with("bchtest:p"));
        assert_eq!(CashAddress::decode(&encoded).unwrap(), addr);

        let token = addr.to_token_aware().encode();
        assert!(token.starts_with("bchtest:r"));
    }
}
