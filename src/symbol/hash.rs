//! Token hashing.
//!
//! Tokens hash with a table-driven CRC-64 over the ASCII-lowercased bytes,
//! seeded with all bits set. Hashing is total: every string, including the
//! empty one, has a symbol.

use super::Symbol;

const POLYNOMIAL: u64 = 0x95AC_9329_AC4B_C9B5;
const SEED: u64 = u64::MAX;

static TABLE: [u64; 256] = build_table();

const fn build_table() -> [u64; 256] {
    let mut table = [0u64; 256];
    let mut i = 0;
    while i < 256 {
        let mut value = (i as u64) << 56;
        let mut bit = 0;
        while bit < 8 {
            value = if value & (1 << 63) != 0 {
                (value << 1) ^ POLYNOMIAL
            } else {
                value << 1
            };
            bit += 1;
        }
        table[i] = value;
        i += 1;
    }
    table
}

/// Hashes a token into its symbol.
pub fn hash_token(token: &str) -> Symbol {
    hash_bytes(token.as_bytes())
}

/// Hashes raw field bytes. Log text is not guaranteed to be UTF-8.
pub fn hash_bytes(bytes: &[u8]) -> Symbol {
    hash_with_seed(bytes, SEED)
}

/// Continues a hash from `seed`, so `hash_with_seed(b, hash_token(a))` equals
/// `hash_token(a + b)`.
fn hash_with_seed(bytes: &[u8], seed: u64) -> Symbol {
    let hash = bytes.iter().fold(seed, |hash, &byte| {
        u64::from(byte.to_ascii_lowercase()) ^ TABLE[(hash >> 56) as usize] ^ (hash << 8)
    });
    Symbol::new(hash)
}
