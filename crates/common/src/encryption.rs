//! Password sealing for documents kept in a content store.
//!
//! A sealed document is `MAGIC || salt || nonce || ciphertext`. The key is
//!  derived from the password with Argon2id over the per-document salt, and
//!  the body is AES-256-GCM, so a wrong password fails authentication rather
//!  than producing garbage.

use std::fmt;
use std::str::FromStr;

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use argon2::Argon2;

const MAGIC: &[u8; 4] = b"DVE1";
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const HEADER_LEN: usize = MAGIC.len() + SALT_LEN + NONCE_LEN;

#[derive(Debug, thiserror::Error)]
pub enum EncryptionError {
    #[error("password must not be empty")]
    EmptyPassword,
    #[error("document is not password protected")]
    NotSealed,
    #[error("wrong password or damaged document")]
    DecryptionFailed,
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),
}

/// A document password. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    pub fn new(password: impl Into<String>) -> Result<Self, EncryptionError> {
        let password = password.into();
        if password.is_empty() {
            return Err(EncryptionError::EmptyPassword);
        }
        Ok(Self(password))
    }

    fn cipher(&self, salt: &[u8]) -> Result<Aes256Gcm, EncryptionError> {
        let mut key = [0u8; 32];
        Argon2::default()
            .hash_password_into(self.0.as_bytes(), salt, &mut key)
            .map_err(|e| EncryptionError::KeyDerivation(e.to_string()))?;
        Ok(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key)))
    }
}

impl FromStr for Password {
    type Err = EncryptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(..)")
    }
}

/// Whether `content` looks like the output of [`seal`].
pub fn is_sealed(content: &[u8]) -> bool {
    content.len() >= HEADER_LEN + TAG_LEN && content.starts_with(MAGIC)
}

/// Encrypt `plaintext` under `password` with a fresh salt and nonce.
pub fn seal(plaintext: &[u8], password: &Password) -> Result<Vec<u8>, EncryptionError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = password
        .cipher(&salt)?
        .encrypt(&nonce, plaintext)
        .map_err(|_| EncryptionError::EncryptionFailed)?;

    let mut sealed = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    sealed.extend_from_slice(MAGIC);
    sealed.extend_from_slice(&salt);
    sealed.extend_from_slice(nonce.as_slice());
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Decrypt a document produced by [`seal`].
pub fn open(sealed: &[u8], password: &Password) -> Result<Vec<u8>, EncryptionError> {
    if !is_sealed(sealed) {
        return Err(EncryptionError::NotSealed);
    }
    let (salt, rest) = sealed[MAGIC.len()..].split_at(SALT_LEN);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

    password
        .cipher(salt)?
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| EncryptionError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn password(s: &str) -> Password {
        s.parse().unwrap()
    }

    #[test]
    fn test_seal_then_open() {
        let sealed = seal(b"HELLOWRLD", &password("hunter2")).unwrap();

        assert!(is_sealed(&sealed));
        assert_eq!(sealed.len(), HEADER_LEN + 9 + TAG_LEN);
        assert_eq!(open(&sealed, &password("hunter2")).unwrap(), b"HELLOWRLD");
    }

    #[test]
    fn test_wrong_password_rejected() {
        let sealed = seal(b"HELLOWRLD", &password("hunter2")).unwrap();
        assert!(matches!(
            open(&sealed, &password("hunter3")),
            Err(EncryptionError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let mut sealed = seal(b"HELLOWRLD", &password("hunter2")).unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 1;
        assert!(matches!(
            open(&sealed, &password("hunter2")),
            Err(EncryptionError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_same_input_seals_differently() {
        let pw = password("hunter2");
        assert_ne!(seal(b"HELLOWRLD", &pw).unwrap(), seal(b"HELLOWRLD", &pw).unwrap());
    }

    #[test]
    fn test_plain_content_is_not_sealed() {
        assert!(!is_sealed(b"HELLOWRLD"));
        assert!(matches!(
            open(b"DVE1 but far too short", &password("hunter2")),
            Err(EncryptionError::NotSealed)
        ));
    }

    #[test]
    fn test_empty_password_rejected() {
        assert!(matches!(
            "".parse::<Password>(),
            Err(EncryptionError::EmptyPassword)
        ));
        assert_eq!(format!("{:?}", password("hunter2")), "Password(..)");
    }
}
