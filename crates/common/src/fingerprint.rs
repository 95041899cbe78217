use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use sha3::{Digest, Sha3_256};

/// Number of leading bytes the legacy scheme hex-encodes.
pub const PREFIX_LEN: usize = 32;

/// How a document's lookup key on the ledger is derived from its bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintScheme {
    /// `0x`-prefixed hex of the SHA3-256 digest over the full content.
    #[default]
    #[serde(rename = "sha3_256")]
    Sha3_256,
    /// Hex of the first 32 bytes of the content, nothing else.
    ///  Two files sharing their first 32 bytes produce the same fingerprint.
    ///  Only useful for looking up registrations made by the legacy web client.
    Prefix32,
}

impl FingerprintScheme {
    pub fn fingerprint(&self, content: &[u8]) -> Result<Fingerprint, FingerprintError> {
        if content.is_empty() {
            return Err(FingerprintError::EmptyDocument);
        }

        let value = match self {
            FingerprintScheme::Sha3_256 => {
                let digest = Sha3_256::digest(content);
                format!("0x{}", hex::encode(digest))
            }
            FingerprintScheme::Prefix32 => {
                hex::encode(&content[..content.len().min(PREFIX_LEN)])
            }
        };

        Ok(Fingerprint(value))
    }
}

impl fmt::Display for FingerprintScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FingerprintScheme::Sha3_256 => write!(f, "sha3_256"),
            FingerprintScheme::Prefix32 => write!(f, "prefix32"),
        }
    }
}

impl FromStr for FingerprintScheme {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha3_256" | "sha3-256" => Ok(FingerprintScheme::Sha3_256),
            "prefix32" => Ok(FingerprintScheme::Prefix32),
            other => Err(FingerprintError::UnknownScheme(other.to_string())),
        }
    }
}

/// The string a document is registered under on the ledger.
///
/// Any non-blank string is accepted when parsing, since verification has to
///  work for fingerprints produced by either scheme (or by other clients).
#[derive(Debug, Clone, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(FingerprintError::EmptyFingerprint);
        }
        Ok(Fingerprint(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FingerprintError {
    #[error("no document content provided")]
    EmptyDocument,
    #[error("document hash required")]
    EmptyFingerprint,
    #[error("unknown fingerprint scheme: {0}")]
    UnknownScheme(String),
}
