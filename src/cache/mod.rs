//! In-memory symbol cache.
//!
//! The cache holds the symbol map seeded at startup (store contents plus
//! anything learned at runtime) and a memo of resolved hex matches used by
//! forward translation. Only the symbol map is ever persisted.

use std::collections::HashMap;

use crate::error::Result;
use crate::store::SymbolStore;
use crate::symbol::{BuiltinTable, Symbol, SymbolCodec, SymbolMap};

#[derive(Debug, Clone, Default)]
pub struct Cache {
    symbols: SymbolMap,
    /// Raw matched hex text -> resolved text. Never persisted.
    memo: HashMap<String, String>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(symbols: SymbolMap) -> Self {
        Self {
            symbols,
            memo: HashMap::new(),
        }
    }

    pub fn lookup(&self, symbol: Symbol) -> Option<&str> {
        self.symbols.get(&symbol).map(String::as_str)
    }

    /// Upserts a mapping. Invalidates the memo.
    pub fn insert(&mut self, symbol: Symbol, token: impl Into<String>) {
        self.symbols.insert(symbol, token.into());
        self.memo.clear();
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Resolves one forward-mode match, memoized by its exact text.
    ///
    /// Text that is not a hex literal is returned unchanged.
    pub fn resolve_hex(&mut self, matched: &str, codec: &SymbolCodec) -> String {
        if let Some(resolved) = self.memo.get(matched) {
            return resolved.clone();
        }
        let resolved = match Symbol::parse_hex(matched) {
            Some(symbol) => codec.resolve_token(symbol, self),
            None => matched.to_string(),
        };
        self.memo.insert(matched.to_string(), resolved.clone());
        resolved
    }

    /// Reads every persisted entry. A store with no entries yields an empty map.
    pub fn load_from_store(store: &dyn SymbolStore) -> Result<SymbolMap> {
        store.load_all()
    }

    /// Overlays the built-in table onto `map`; built-in entries win conflicts.
    pub fn merge_builtin(map: &mut SymbolMap, table: &BuiltinTable) {
        for (symbol, token) in table.iter() {
            map.insert(symbol, token.to_string());
        }
    }

    /// Writes every entry of `map` in one store transaction.
    pub fn flush_to_store(store: &dyn SymbolStore, map: &SymbolMap) -> Result<usize> {
        store.write_all(map)
    }
}
