use std::fmt;
use std::str::FromStr;

use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;

use super::{keccak256, Address};
use crate::ledger::transaction::TransactionError;

/// A secp256k1 private key held by this process.
#[derive(Clone)]
pub struct LocalKey {
    key: SigningKey,
    address: Address,
}

impl LocalKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let key = SigningKey::from_slice(bytes).map_err(|_| TransactionError::InvalidKey)?;
        let address = address_of(&key);
        Ok(Self { key, address })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.key
    }
}

impl FromStr for LocalKey {
    type Err = TransactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(digits).map_err(|_| TransactionError::InvalidKey)?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Debug for LocalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalKey")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Last 20 bytes of the keccak hash of the uncompressed public key.
fn address_of(key: &SigningKey) -> Address {
    let point = key.verifying_key().as_affine().to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash[12..]);
    Address::from_bytes(bytes)
}

/// Who pays for and authorizes a registration.
#[derive(Debug, Clone)]
pub enum Signer {
    /// Sign locally and submit with `eth_sendRawTransaction`.
    LocalKey(LocalKey),
    /// Let the node sign for an account it has unlocked (dev chains).
    Unlocked(Address),
}

impl Signer {
    pub fn address(&self) -> Address {
        match self {
            Signer::LocalKey(key) => key.address(),
            Signer::Unlocked(address) => *address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HARDHAT_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_address_derivation() {
        let key: LocalKey = HARDHAT_KEY.parse().unwrap();
        assert_eq!(
            key.address().to_string(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
    }

    #[test]
    fn test_key_without_prefix() {
        let key: LocalKey = HARDHAT_KEY.trim_start_matches("0x").parse().unwrap();
        assert_eq!(
            Signer::LocalKey(key).address().to_string(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
    }

    #[test]
    fn test_invalid_keys_rejected() {
        assert!("0x1234".parse::<LocalKey>().is_err());
        assert!("zz".parse::<LocalKey>().is_err());
        // zero is not a valid scalar
        assert!(format!("0x{}", "00".repeat(32)).parse::<LocalKey>().is_err());
    }

    #[test]
    fn test_debug_hides_key_material() {
        let key: LocalKey = HARDHAT_KEY.parse().unwrap();
        let shown = format!("{:?}", Signer::LocalKey(key));
        assert!(!shown.contains("ac0974bec39a17e3"));
        assert!(shown.contains("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"));
    }
}
