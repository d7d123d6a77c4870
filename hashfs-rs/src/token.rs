use crate::error::VfsError;
use std::fmt::{self, Write};

/// Characters a token may hold; index 0 terminates the string.
const ALPHABET: &[u8; 38] = b"\x000123456789abcdefghijklmnopqrstuvwxyz_";

/// Longest string a token can encode (38^12 still fits in 64 bits).
pub const MAX_TOKEN_LENGTH: usize = 12;

/// A short identifier packed into 64 bits, used as a compact metadata key.
///
/// Tokens hold up to twelve characters from `0-9`, `a-z` and `_`, stored as
/// a little-endian base-38 number.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(u64);

impl Token {
    /// Encodes `text`, rejecting strings that are too long or use characters
    /// outside the token alphabet.
    pub fn new(text: &str) -> Result<Self, VfsError> {
        if text.len() > MAX_TOKEN_LENGTH {
            return Err(VfsError::InvalidData(format!(
                "Token '{text}' exceeds {MAX_TOKEN_LENGTH} characters"
            )));
        }

        let mut value = 0u64;
        let mut multiplier = 1u64;
        for byte in text.bytes() {
            let index = Self::char_index(byte).ok_or_else(|| {
                VfsError::InvalidData(format!("Token '{text}' contains invalid character"))
            })?;
            value += index * multiplier;
            multiplier = multiplier.wrapping_mul(ALPHABET.len() as u64);
        }
        Ok(Token(value))
    }

    /// Encodes a string known at compile time. Invalid input fails const evaluation.
    pub const fn from_static(text: &'static str) -> Self {
        let bytes = text.as_bytes();
        assert!(bytes.len() <= MAX_TOKEN_LENGTH, "token too long");

        let mut value = 0u64;
        let mut multiplier = 1u64;
        let mut i = 0;
        while i < bytes.len() {
            let index = match Self::char_index(bytes[i]) {
                Some(index) => index,
                None => panic!("invalid token character"),
            };
            value += index * multiplier;
            multiplier = multiplier.wrapping_mul(ALPHABET.len() as u64);
            i += 1;
        }
        Token(value)
    }

    /// Wraps an already encoded value.
    pub const fn from_raw(value: u64) -> Self {
        Token(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    const fn char_index(byte: u8) -> Option<u64> {
        match byte {
            b'0'..=b'9' => Some((byte - b'0') as u64 + 1),
            b'a'..=b'z' => Some((byte - b'a') as u64 + 11),
            b'A'..=b'Z' => Some((byte - b'A') as u64 + 11),
            b'_' => Some(37),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = ALPHABET.len() as u64;
        let mut value = self.0;
        while value != 0 {
            f.write_char(ALPHABET[(value % base) as usize] as char)?;
            value /= base;
        }
        Ok(())
    }
}

impl TryFrom<&str> for Token {
    type Error = VfsError;

    fn try_from(text: &str) -> Result<Self, Self::Error> {
        Token::new(text)
    }
}
