use k256::ecdsa::RecoveryId;

use super::signer::LocalKey;
use super::{keccak256, Address};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    #[error("invalid secp256k1 private key")]
    InvalidKey,
    #[error("signing failed: {0}")]
    Signing(String),
}

/// Pre-EIP-1559 transaction, replay protected per EIP-155.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Address,
    pub value: u128,
    pub data: Vec<u8>,
    pub chain_id: u64,
}

impl LegacyTransaction {
    fn fields(&self) -> Vec<Vec<u8>> {
        vec![
            rlp::encode_uint(self.nonce as u128),
            rlp::encode_uint(self.gas_price),
            rlp::encode_uint(self.gas_limit as u128),
            rlp::encode_bytes(self.to.as_bytes()),
            rlp::encode_uint(self.value),
            rlp::encode_bytes(&self.data),
        ]
    }

    /// `rlp([nonce, gasPrice, gas, to, value, data, chainId, 0, 0])`
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut fields = self.fields();
        fields.push(rlp::encode_uint(self.chain_id as u128));
        fields.push(rlp::encode_uint(0));
        fields.push(rlp::encode_uint(0));
        rlp::encode_list(&fields)
    }

    pub fn signing_hash(&self) -> [u8; 32] {
        keccak256(&self.signing_payload())
    }

    /// Sign and return the raw transaction bytes for `eth_sendRawTransaction`.
    pub fn sign(&self, key: &LocalKey) -> Result<Vec<u8>, TransactionError> {
        let hash = self.signing_hash();
        let (mut signature, mut recovery_id) = key
            .signing_key()
            .sign_prehash_recoverable(&hash)
            .map_err(|e| TransactionError::Signing(e.to_string()))?;

        // only low-s signatures are accepted by the network
        if let Some(normalized) = signature.normalize_s() {
            signature = normalized;
            recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
        }

        let v = recovery_id.to_byte() as u128 + 35 + 2 * self.chain_id as u128;
        let (r, s) = signature.split_bytes();

        let mut fields = self.fields();
        fields.push(rlp::encode_uint(v));
        fields.push(rlp::encode_bytes(strip_leading_zeros(&r)));
        fields.push(rlp::encode_bytes(strip_leading_zeros(&s)));
        Ok(rlp::encode_list(&fields))
    }
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

mod rlp {
    use super::strip_leading_zeros;

    pub fn encode_bytes(bytes: &[u8]) -> Vec<u8> {
        if bytes.len() == 1 && bytes[0] < 0x80 {
            return bytes.to_vec();
        }
        let mut out = length_prefix(bytes.len(), 0x80);
        out.extend_from_slice(bytes);
        out
    }

    /// Integers are big-endian with no leading zeros; zero is the empty string.
    pub fn encode_uint(value: u128) -> Vec<u8> {
        let bytes = value.to_be_bytes();
        encode_bytes(strip_leading_zeros(&bytes))
    }

    pub fn encode_list(items: &[Vec<u8>]) -> Vec<u8> {
        let payload: Vec<u8> = items.concat();
        let mut out = length_prefix(payload.len(), 0xc0);
        out.extend(payload);
        out
    }

    fn length_prefix(len: usize, offset: u8) -> Vec<u8> {
        if len <= 55 {
            return vec![offset + len as u8];
        }
        let len_bytes = (len as u64).to_be_bytes();
        let len_bytes = strip_leading_zeros(&len_bytes);
        let mut out = vec![offset + 55 + len_bytes.len() as u8];
        out.extend_from_slice(len_bytes);
        out
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_rlp_scalars() {
            assert_eq!(encode_uint(0), vec![0x80]);
            assert_eq!(encode_uint(15), vec![0x0f]);
            assert_eq!(encode_uint(1024), vec![0x82, 0x04, 0x00]);
            assert_eq!(encode_bytes(b"dog"), vec![0x83, b'd', b'o', b'g']);
            assert_eq!(encode_bytes(&[]), vec![0x80]);
        }

        #[test]
        fn test_rlp_long_string() {
            let body = vec![b'a'; 56];
            let encoded = encode_bytes(&body);
            assert_eq!(&encoded[..2], &[0xb8, 56]);
            assert_eq!(encoded.len(), 58);
        }

        #[test]
        fn test_rlp_lists() {
            assert_eq!(encode_list(&[]), vec![0xc0]);
            let cat_dog = encode_list(&[encode_bytes(b"cat"), encode_bytes(b"dog")]);
            assert_eq!(
                cat_dog,
                vec![0xc8, 0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g']
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eip155_example() -> LegacyTransaction {
        LegacyTransaction {
            nonce: 9,
            gas_price: 20_000_000_000,
            gas_limit: 21_000,
            to: "0x3535353535353535353535353535353535353535".parse().unwrap(),
            value: 1_000_000_000_000_000_000,
            data: vec![],
            chain_id: 1,
        }
    }

    #[test]
    fn test_signing_payload_matches_eip155_example() {
        let tx = eip155_example();
        assert_eq!(
            hex::encode(tx.signing_payload()),
            "ec098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a764000080018080"
        );
        assert_eq!(
            hex::encode(tx.signing_hash()),
            "daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );
    }

    #[test]
    fn test_signed_transaction_matches_eip155_example() {
        let key: LocalKey = format!("0x{}", "46".repeat(32)).parse().unwrap();
        let raw = eip155_example().sign(&key).unwrap();
        assert_eq!(
            hex::encode(raw),
            "f86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        );
    }

    #[test]
    fn test_chain_id_is_part_of_signing_hash() {
        let mainnet = eip155_example();
        let mut dev = eip155_example();
        dev.chain_id = 1337;
        assert_ne!(mainnet.signing_hash(), dev.signing_hash());
        // 1337 needs two bytes: 0x82 0x05 0x39, then the two empty r/s slots
        assert!(hex::encode(dev.signing_payload()).ends_with("8205398080"));
    }
}
