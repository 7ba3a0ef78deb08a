//! Built-in table of well-known symbol/token pairs.
//!
//! The table ships inside the binary as JSON and is parsed once, on first use.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::Deserialize;

use super::{Symbol, SymbolMap};
use crate::error::Result;

const BUILTIN_JSON: &str = include_str!("builtin.json");

/// Process-wide built-in table.
pub static BUILTIN_SYMBOLS: Lazy<Arc<BuiltinTable>> = Lazy::new(|| {
    match BuiltinTable::from_json(BUILTIN_JSON) {
        Ok(table) => Arc::new(table),
        Err(e) => {
            tracing::error!("Failed to parse built-in symbol table: {}", e);
            Arc::new(BuiltinTable::default())
        }
    }
});

#[derive(Debug, Deserialize)]
struct BuiltinEntry {
    symbol: String,
    token: String,
}

/// Read-only symbol table with a reverse index from token to symbol.
#[derive(Debug, Clone, Default)]
pub struct BuiltinTable {
    by_symbol: SymbolMap,
    /// Keys are lowercased, matching the case-insensitive hash.
    by_token: HashMap<String, Symbol>,
}

impl BuiltinTable {
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<BuiltinEntry> = serde_json::from_str(json)?;
        let mut pairs = Vec::with_capacity(entries.len());
        for entry in entries {
            pairs.push((entry.symbol.parse::<Symbol>()?, entry.token));
        }
        Ok(Self::from_pairs(pairs))
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (Symbol, String)>) -> Self {
        let mut table = Self::default();
        for (symbol, token) in pairs {
            table.by_token.insert(token.to_ascii_lowercase(), symbol);
            table.by_symbol.insert(symbol, token);
        }
        table
    }

    pub fn get(&self, symbol: Symbol) -> Option<&str> {
        self.by_symbol.get(&symbol).map(String::as_str)
    }

    pub fn symbol_for(&self, token: &str) -> Option<Symbol> {
        self.by_token.get(&token.to_ascii_lowercase()).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &str)> {
        self.by_symbol.iter().map(|(s, t)| (*s, t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}
