//! Line rewriting in both directions.
//!
//! Forward mode replaces known `0x`-prefixed 16-digit hashes with their tokens.
//! Reverse mode replaces every space-separated field with its hash. Lines are
//! raw bytes; anything that is not rewritten is passed through unchanged.

use once_cell::sync::Lazy;
use regex::bytes::{Captures, Regex};

use crate::cache::Cache;
use crate::symbol::{Symbol, SymbolCodec, SymbolMap};

/// Matches a symbol in its textual form. Shared by every transformer.
pub static SYMBOL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"0x[0-9a-fA-F]{16}").expect("symbol pattern is a valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Hash -> token.
    #[default]
    Forward,
    /// Token -> hash.
    Reverse,
}

pub struct LineTransformer {
    codec: SymbolCodec,
    cache: Cache,
    direction: Direction,
    uppercase: bool,
}

impl LineTransformer {
    pub fn new(codec: SymbolCodec, cache: Cache) -> Self {
        Self {
            codec,
            cache,
            direction: Direction::Forward,
            uppercase: false,
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_uppercase(mut self, uppercase: bool) -> Self {
        self.uppercase = uppercase;
        self
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut Cache {
        &mut self.cache
    }

    /// Rewrites `line` in the configured direction. In reverse mode, `learned`
    /// receives every symbol -> field pair encountered.
    pub fn transform_line(&mut self, line: &[u8], learned: Option<&mut SymbolMap>) -> Vec<u8> {
        match self.direction {
            Direction::Forward => self.replace_hashes(line),
            Direction::Reverse => self.replace_tokens(line, self.uppercase, learned),
        }
    }

    /// Replaces known hashes with tokens in a single pass.
    ///
    /// Unknown hashes, hex runs longer than 16 digits, and anything shorter
    /// are left untouched. Replacement text is never rescanned.
    pub fn replace_hashes(&mut self, line: &[u8]) -> Vec<u8> {
        let codec = &self.codec;
        let cache = &mut self.cache;
        SYMBOL_PATTERN
            .replace_all(line, |caps: &Captures| {
                let Some(m) = caps.get(0) else {
                    return Vec::new();
                };
                let continues_hex = line
                    .get(m.end())
                    .is_some_and(|b| b.is_ascii_hexdigit());
                if continues_hex {
                    return m.as_bytes().to_vec();
                }
                // The pattern only matches ASCII.
                let Ok(matched) = std::str::from_utf8(m.as_bytes()) else {
                    return m.as_bytes().to_vec();
                };

                let resolved = cache.resolve_hex(matched, codec);
                if resolved.starts_with("0x") {
                    m.as_bytes().to_vec()
                } else {
                    resolved.into_bytes()
                }
            })
            .into_owned()
    }

    /// Replaces each space-separated field with its hash.
    ///
    /// Runs of spaces collapse to one; an empty or all-space line becomes
    /// empty. Fields that are already hex literals are converted but not
    /// recorded in `learned`, and neither are fields that are not UTF-8.
    pub fn replace_tokens(
        &self,
        line: &[u8],
        uppercase: bool,
        mut learned: Option<&mut SymbolMap>,
    ) -> Vec<u8> {
        let mut hashes = Vec::new();
        for field in line.split(|&b| b == b' ').filter(|f| !f.is_empty()) {
            let symbol = self.codec.to_symbol(field);
            hashes.push(self.codec.hex_string(symbol, uppercase));

            let Some(map) = learned.as_deref_mut() else {
                continue;
            };
            if Symbol::parse_hex_bytes(field).is_some() {
                continue;
            }
            match std::str::from_utf8(field) {
                Ok(token) => {
                    map.insert(symbol, token.to_string());
                }
                Err(_) => tracing::debug!("Not recording non-UTF-8 field as {}", symbol),
            }
        }
        hashes.join(" ").into_bytes()
    }
}
