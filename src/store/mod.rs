pub mod migrations;
pub mod path;
pub mod sqlite;

use crate::error::Result;
use crate::symbol::SymbolMap;

pub use path::{default_db_path, expand_home};
pub use sqlite::SqliteStore;

/// Name of the partition holding learned symbol/token pairs.
pub const HASH_PARTITION: &str = "hashes";

/// Persistent symbol -> token storage.
///
/// Keys are 8-byte little-endian symbols, values are raw UTF-8 token bytes.
pub trait SymbolStore: Send + Sync {
    /// Reads every entry of the partition.
    fn load_all(&self) -> Result<SymbolMap>;
    /// Upserts every entry in one transaction. Returns the number written.
    fn write_all(&self, entries: &SymbolMap) -> Result<usize>;
    fn len(&self) -> Result<usize>;
    /// Flushes buffered writes to the main database file.
    fn sync(&self) -> Result<()>;
    /// Closes the store. Closing twice is a no-op.
    fn close(&self) -> Result<()>;
    fn is_closed(&self) -> bool;
}
