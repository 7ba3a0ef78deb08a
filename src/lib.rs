pub mod cache;
pub mod config;
pub mod error;
pub mod runner;
pub mod server;
pub mod session;
pub mod store;
pub mod symbol;
pub mod transform;

pub use cache::Cache;
pub use config::{Config, Input};
pub use error::{EvrcatError, Result};
pub use runner::{process_reader, run, InputOutcome, RunSummary};
pub use server::{CatServer, ConnectionTotals, ReplacementTable, ServerStats, StatsSnapshot};
pub use session::{FinishOutcome, StoreSession};
pub use store::{SqliteStore, SymbolStore};
pub use symbol::{hash_bytes, hash_token, BuiltinTable, Symbol, SymbolCodec, SymbolMap, BUILTIN_SYMBOLS};
pub use transform::{Direction, LineTransformer, SYMBOL_PATTERN};
