//! Minimal Solidity ABI codec covering the types the registry contract uses.

use super::{keccak256, Address};

const WORD: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address(Address),
    String(String),
    /// Big-endian `uint256`.
    Uint([u8; WORD]),
    Bool(bool),
}

impl Token {
    pub fn uint(value: u128) -> Self {
        let mut word = [0u8; WORD];
        word[WORD - 16..].copy_from_slice(&value.to_be_bytes());
        Token::Uint(word)
    }

    pub fn into_address(self) -> Option<Address> {
        match self {
            Token::Address(address) => Some(address),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Token::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_bool(self) -> Option<bool> {
        match self {
            Token::Bool(value) => Some(value),
            _ => None,
        }
    }

    /// The value as `u64`, or `None` when it is not a uint or does not fit.
    pub fn into_u64(self) -> Option<u64> {
        match self {
            Token::Uint(word) if word[..WORD - 8].iter().all(|b| *b == 0) => {
                let mut tail = [0u8; 8];
                tail.copy_from_slice(&word[WORD - 8..]);
                Some(u64::from_be_bytes(tail))
            }
            _ => None,
        }
    }

    fn is_dynamic(&self) -> bool {
        matches!(self, Token::String(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Address,
    String,
    Uint256,
    Bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbiError {
    #[error("return data too short: need {needed} bytes at offset {offset}, have {len}")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        len: usize,
    },
    #[error("invalid {0} value in return data")]
    InvalidValue(&'static str),
    #[error("string is not valid utf-8")]
    InvalidUtf8,
}

/// First four bytes of the keccak hash of a canonical function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Calldata for `signature` applied to `tokens`.
pub fn encode_call(signature: &str, tokens: &[Token]) -> Vec<u8> {
    let mut data = selector(signature).to_vec();
    data.extend(encode(tokens));
    data
}

/// Head/tail encode a tuple of tokens.
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&usize_word(head_len + tail.len()));
            encode_dynamic(token, &mut tail);
        } else {
            head.extend_from_slice(&static_word(token));
        }
    }

    head.extend(tail);
    head
}

fn static_word(token: &Token) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    match token {
        Token::Address(address) => word[WORD - 20..].copy_from_slice(address.as_bytes()),
        Token::Uint(value) => word = *value,
        Token::Bool(value) => word[WORD - 1] = *value as u8,
        Token::String(_) => unreachable!("strings are dynamic"),
    }
    word
}

fn encode_dynamic(token: &Token, out: &mut Vec<u8>) {
    if let Token::String(value) = token {
        let bytes = value.as_bytes();
        out.extend_from_slice(&usize_word(bytes.len()));
        out.extend_from_slice(bytes);
        let padding = (WORD - bytes.len() % WORD) % WORD;
        out.extend(std::iter::repeat(0u8).take(padding));
    }
}

fn usize_word(value: usize) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&(value as u64).to_be_bytes());
    word
}

/// Decode return data laid out as the tuple `types`.
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    types
        .iter()
        .enumerate()
        .map(|(i, param)| decode_param(*param, data, i * WORD))
        .collect()
}

fn decode_param(param: ParamType, data: &[u8], offset: usize) -> Result<Token, AbiError> {
    let word = read_word(data, offset)?;
    match param {
        ParamType::Address => {
            if word[..WORD - 20].iter().any(|b| *b != 0) {
                return Err(AbiError::InvalidValue("address"));
            }
            let mut bytes = [0u8; 20];
            bytes.copy_from_slice(&word[WORD - 20..]);
            Ok(Token::Address(Address::from_bytes(bytes)))
        }
        ParamType::Uint256 => Ok(Token::Uint(word)),
        ParamType::Bool => {
            if word[..WORD - 1].iter().any(|b| *b != 0) || word[WORD - 1] > 1 {
                return Err(AbiError::InvalidValue("bool"));
            }
            Ok(Token::Bool(word[WORD - 1] == 1))
        }
        ParamType::String => {
            let start = word_to_usize(&word, "string offset")?;
            let len = word_to_usize(&read_word(data, start)?, "string length")?;
            let body_start = start + WORD;
            let body = data
                .get(body_start..body_start + len)
                .ok_or(AbiError::OutOfBounds {
                    offset: body_start,
                    needed: len,
                    len: data.len(),
                })?;
            String::from_utf8(body.to_vec())
                .map(Token::String)
                .map_err(|_| AbiError::InvalidUtf8)
        }
    }
}

fn read_word(data: &[u8], offset: usize) -> Result<[u8; WORD], AbiError> {
    let slice = data
        .get(offset..offset + WORD)
        .ok_or(AbiError::OutOfBounds {
            offset,
            needed: WORD,
            len: data.len(),
        })?;
    let mut word = [0u8; WORD];
    word.copy_from_slice(slice);
    Ok(word)
}

fn word_to_usize(word: &[u8; WORD], what: &'static str) -> Result<usize, AbiError> {
    if word[..WORD - 4].iter().any(|b| *b != 0) {
        return Err(AbiError::InvalidValue(what));
    }
    let mut tail = [0u8; 4];
    tail.copy_from_slice(&word[WORD - 4..]);
    Ok(u32::from_be_bytes(tail) as usize)
}
