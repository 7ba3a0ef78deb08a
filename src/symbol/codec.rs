use std::sync::Arc;

use super::{hash_bytes, BuiltinTable, Symbol, BUILTIN_SYMBOLS};
use crate::cache::Cache;

/// Hash function mapping a token to its symbol.
pub type HashFn = fn(&[u8]) -> Symbol;

/// Converts between tokens and symbols.
///
/// Token to symbol is total. Symbol to token needs a mapping from the cache or
/// the built-in table; without one the symbol's hex form is returned.
#[derive(Debug, Clone)]
pub struct SymbolCodec {
    table: Arc<BuiltinTable>,
    hasher: HashFn,
}

impl Default for SymbolCodec {
    fn default() -> Self {
        Self::new(BUILTIN_SYMBOLS.clone())
    }
}

impl SymbolCodec {
    pub fn new(table: Arc<BuiltinTable>) -> Self {
        Self {
            table,
            hasher: hash_bytes,
        }
    }

    pub fn with_hasher(mut self, hasher: HashFn) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn table(&self) -> &BuiltinTable {
        &self.table
    }

    /// Hex literals parse to themselves, built-in tokens use their table
    /// symbol, everything else is hashed.
    pub fn to_symbol<T: AsRef<[u8]> + ?Sized>(&self, token: &T) -> Symbol {
        let bytes = token.as_ref();
        if let Some(symbol) = Symbol::parse_hex_bytes(bytes) {
            return symbol;
        }
        let known = std::str::from_utf8(bytes)
            .ok()
            .and_then(|token| self.table.symbol_for(token));
        known.unwrap_or_else(|| (self.hasher)(bytes))
    }

    pub fn hex_string(&self, symbol: Symbol, uppercase: bool) -> String {
        symbol.hex_string(uppercase)
    }

    pub fn resolve_token(&self, symbol: Symbol, cache: &Cache) -> String {
        cache
            .lookup(symbol)
            .or_else(|| self.table.get(symbol))
            .map(str::to_owned)
            .unwrap_or_else(|| symbol.hex_string(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_hash(_: &[u8]) -> Symbol {
        Symbol::new(42)
    }

    #[test]
    fn test_builtin_token_uses_table_symbol() {
        let codec = SymbolCodec::default();
        assert_eq!(
            codec.to_symbol("mnu_master"),
            Symbol::new(0xac36_0e41_e4ed_e056)
        );
    }

    #[test]
    fn test_hex_literal_parses_to_itself() {
        let codec = SymbolCodec::default().with_hasher(fixed_hash);
        assert_eq!(
            codec.to_symbol("0xFF360E41E4EDE056"),
            Symbol::new(0xff36_0e41_e4ed_e056)
        );
    }

    #[test]
    fn test_unknown_token_is_hashed() {
        let codec = SymbolCodec::default().with_hasher(fixed_hash);
        assert_eq!(codec.to_symbol("unknown_level"), Symbol::new(42));
        assert_eq!(codec.to_symbol(""), Symbol::new(42));
        assert_eq!(codec.to_symbol(b"caf\xe9".as_slice()), Symbol::new(42));
    }

    #[test]
    fn test_resolve_prefers_cache_then_table() {
        let codec = SymbolCodec::default();
        let mut cache = Cache::new();
        let known = Symbol::new(0xac36_0e41_e4ed_e056);
        assert_eq!(codec.resolve_token(known, &cache), "mnu_master");

        let learned = Symbol::new(7);
        cache.insert(learned, "lobby_level");
        assert_eq!(codec.resolve_token(learned, &cache), "lobby_level");
    }

    #[test]
    fn test_resolve_unknown_falls_back_to_lowercase_hex() {
        let codec = SymbolCodec::default();
        let cache = Cache::new();
        let unknown = Symbol::new(0xff36_0e41_e4ed_e056);
        assert_eq!(codec.resolve_token(unknown, &cache), "0xff360e41e4ede056");
    }

    #[test]
    fn test_custom_table() {
        let table = BuiltinTable::from_pairs([(Symbol::new(1), "one".to_string())]);
        let codec = SymbolCodec::new(Arc::new(table));
        assert_eq!(codec.to_symbol("ONE"), Symbol::new(1));
        assert_eq!(codec.resolve_token(Symbol::new(1), &Cache::new()), "one");
    }
}
