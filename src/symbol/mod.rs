//! Engine symbols: 64-bit hashes of token strings.
//!
//! A [`Symbol`] is rendered as `0x` followed by exactly 16 hex digits and is
//! stored on disk as 8 little-endian bytes.

pub mod builtin;
pub mod codec;
pub mod hash;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::EvrcatError;

pub use builtin::{BuiltinTable, BUILTIN_SYMBOLS};
pub use codec::SymbolCodec;
pub use hash::{hash_bytes, hash_token};

/// Mapping from symbol to the token it was hashed from.
pub type SymbolMap = HashMap<Symbol, String>;

/// Number of hex digits in the textual form of a symbol.
pub const SYMBOL_HEX_DIGITS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u64);

impl Symbol {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    /// Renders the symbol as `0x` + 16 hex digits. The prefix is always lowercase.
    pub fn hex_string(self, uppercase: bool) -> String {
        if uppercase {
            format!("0x{:016X}", self.0)
        } else {
            format!("0x{:016x}", self.0)
        }
    }

    /// Parses a `0x`-prefixed hex literal of 1 to 16 digits, either case.
    pub fn parse_hex(s: &str) -> Option<Self> {
        Self::parse_hex_bytes(s.as_bytes())
    }

    /// Byte form of [`Symbol::parse_hex`].
    pub fn parse_hex_bytes(bytes: &[u8]) -> Option<Self> {
        let digits = bytes.strip_prefix(b"0x")?;
        if digits.is_empty() || digits.len() > SYMBOL_HEX_DIGITS {
            return None;
        }
        digits
            .iter()
            .try_fold(0u64, |value, &b| {
                let digit = char::from(b).to_digit(16)?;
                Some((value << 4) | u64::from(digit))
            })
            .map(Self)
    }

    pub fn to_le_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    /// Decodes a store key. Returns `None` unless the slice is exactly 8 bytes.
    pub fn from_le_slice(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; 8] = bytes.try_into().ok()?;
        Some(Self(u64::from_le_bytes(raw)))
    }
}

impl From<u64> for Symbol {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = EvrcatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s).ok_or_else(|| EvrcatError::InvalidSymbol(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_string_case() {
        let sym = Symbol::new(0xac36_0e41_e4ed_e056);
        assert_eq!(sym.hex_string(false), "0xac360e41e4ede056");
        assert_eq!(sym.hex_string(true), "0xAC360E41E4EDE056");
        assert_eq!(sym.to_string(), "0xac360e41e4ede056");
    }

    #[test]
    fn test_hex_string_zero_padded() {
        assert_eq!(Symbol::new(0x12).hex_string(false), "0x0000000000000012");
    }

    #[test]
    fn test_parse_hex_accepts_either_case() {
        let lower = Symbol::parse_hex("0xac360e41e4ede056").unwrap();
        let upper = Symbol::parse_hex("0xAC360E41E4EDE056").unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.value(), 0xac36_0e41_e4ed_e056);
    }

    #[test]
    fn test_parse_hex_rejects_malformed() {
        assert!(Symbol::parse_hex("ac360e41e4ede056").is_none());
        assert!(Symbol::parse_hex("0x").is_none());
        assert!(Symbol::parse_hex("0x+f").is_none());
        assert!(Symbol::parse_hex("0xzz").is_none());
        assert!(Symbol::parse_hex("0x0ac360e41e4ede056").is_none());
        assert!("mnu_master".parse::<Symbol>().is_err());
        assert!(Symbol::parse_hex_bytes(b"0xac36\xe9").is_none());
    }

    #[test]
    fn test_le_bytes() {
        let sym = Symbol::new(0x0102_0304_0506_0708);
        let bytes = sym.to_le_bytes();
        assert_eq!(bytes[0], 0x08);
        assert_eq!(Symbol::from_le_slice(&bytes), Some(sym));
        assert_eq!(Symbol::from_le_slice(&bytes[..7]), None);
    }
}
