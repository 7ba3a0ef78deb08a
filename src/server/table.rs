use std::collections::HashMap;

use crate::symbol::{BuiltinTable, SYMBOL_HEX_DIGITS};

/// Length of a symbol's textual form, `0x` included.
const KEY_LEN: usize = SYMBOL_HEX_DIGITS + 2;

/// Literal hex -> token replacements for the line server.
///
/// Every symbol is keyed by its all-lowercase and all-uppercase hex forms.
/// The table is immutable once built and shared by all connections.
#[derive(Debug, Clone, Default)]
pub struct ReplacementTable {
    entries: HashMap<Vec<u8>, Vec<u8>>,
}

impl ReplacementTable {
    pub fn from_builtin(table: &BuiltinTable) -> Self {
        let mut entries = HashMap::with_capacity(table.len() * 2);
        for (symbol, token) in table.iter() {
            entries.insert(symbol.hex_string(false).into_bytes(), token.as_bytes().to_vec());
            entries.insert(symbol.hex_string(true).into_bytes(), token.as_bytes().to_vec());
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replaces every key occurrence, scanning left to right without overlap.
    /// Bytes outside a replaced key are copied unchanged.
    pub fn replace(&self, line: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(line.len());
        let mut copied = 0;
        let mut pos = 0;

        while pos + KEY_LEN <= line.len() {
            if line[pos] == b'0' && line[pos + 1] == b'x' {
                if let Some(token) = self.entries.get(&line[pos..pos + KEY_LEN]) {
                    out.extend_from_slice(&line[copied..pos]);
                    out.extend_from_slice(token);
                    pos += KEY_LEN;
                    copied = pos;
                    continue;
                }
            }
            pos += 1;
        }

        out.extend_from_slice(&line[copied..]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{Symbol, BUILTIN_SYMBOLS};

    fn table() -> ReplacementTable {
        ReplacementTable::from_builtin(&BUILTIN_SYMBOLS)
    }

    fn replace(t: &ReplacementTable, line: &str) -> String {
        String::from_utf8(t.replace(line.as_bytes())).unwrap()
    }

    #[test]
    fn test_both_cases_are_keys() {
        let t = table();
        assert_eq!(t.len(), BUILTIN_SYMBOLS.len() * 2);
        assert_eq!(replace(&t, "'0xac360e41e4ede056'"), "'mnu_master'");
        assert_eq!(replace(&t, "'0xAC360E41E4EDE056'"), "'mnu_master'");
    }

    #[test]
    fn test_mixed_case_is_not_a_key() {
        let line = "'0xAc360E41e4ede056'";
        assert_eq!(replace(&table(), line), line);
    }

    #[test]
    fn test_unknown_and_plain_text_untouched() {
        let t = table();
        assert_eq!(replace(&t, ""), "");
        assert_eq!(replace(&t, "no symbols here"), "no symbols here");
        assert_eq!(replace(&t, "0xff360e41e4ede056"), "0xff360e41e4ede056");
    }

    #[test]
    fn test_adjacent_and_multibyte_text() {
        let t = table();
        assert_eq!(
            replace(&t, "é0xac360e41e4ede0560x667feb110569d3a3ü"),
            "émnu_masteremote_vrml_aü"
        );
    }

    #[test]
    fn test_invalid_utf8_is_copied() {
        assert_eq!(
            table().replace(b"\xe9\xff0xac360e41e4ede056\xfe"),
            b"\xe9\xffmnu_master\xfe".to_vec()
        );
    }

    #[test]
    fn test_custom_table() {
        let builtin = BuiltinTable::from_pairs([(Symbol::new(0x1f), "tiny".to_string())]);
        let t = ReplacementTable::from_builtin(&builtin);
        assert_eq!(replace(&t, "id=0x000000000000001F"), "id=tiny");
    }
}
