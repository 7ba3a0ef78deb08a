//! Store session.
//!
//! Owns the opened store and, in reverse+update mode, the map of learned
//! symbols that will be written back. Both the main flow and the signal
//! listener end the session through [`StoreSession::finish`], which runs at
//! most once.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::cache::Cache;
use crate::config::Config;
use crate::error::{EvrcatError, Result};
use crate::store::{SqliteStore, SymbolStore};
use crate::symbol::{BuiltinTable, SymbolMap};

/// What [`StoreSession::finish`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishOutcome {
    /// Store closed; `flushed` entries were written first.
    Closed { flushed: usize },
    /// No store was open.
    Detached,
    /// An earlier call already finished the session.
    AlreadyFinished,
}

pub struct StoreSession {
    store: Option<Arc<dyn SymbolStore>>,
    persist: bool,
    learned: Mutex<SymbolMap>,
    finished: AtomicBool,
}

impl StoreSession {
    /// A session without a store. Nothing is loaded or persisted.
    pub fn detached() -> Self {
        Self {
            store: None,
            persist: false,
            learned: Mutex::new(SymbolMap::new()),
            finished: AtomicBool::new(false),
        }
    }

    /// Wraps an open store.
    ///
    /// With `persist`, the session starts from `seed` (store contents overlaid
    /// with the built-in table) and writes the learned map back on finish.
    pub fn attached(store: Arc<dyn SymbolStore>, persist: bool, seed: SymbolMap) -> Self {
        Self {
            store: Some(store),
            persist,
            learned: Mutex::new(if persist { seed } else { SymbolMap::new() }),
            finished: AtomicBool::new(false),
        }
    }

    /// Opens the store named by `config` and loads it.
    ///
    /// Returns the session and the loaded entries used to seed the forward
    /// cache. Open and read failures are soft unless the run must persist
    /// learned symbols, in which case they are returned as errors.
    pub fn open(config: &Config, builtin: &BuiltinTable) -> Result<(Self, SymbolMap)> {
        let persist = config.persist_learned();
        let Some(path) = config.db_path.as_deref() else {
            if persist {
                return Err(EvrcatError::Config(
                    "--update-db requires a database path".to_string(),
                ));
            }
            return Ok((Self::detached(), SymbolMap::new()));
        };

        let store: Arc<dyn SymbolStore> = match SqliteStore::open(path) {
            Ok(store) => Arc::new(store),
            Err(e) if !persist => {
                tracing::error!("Error opening database {}: {}", path.display(), e);
                return Ok((Self::detached(), SymbolMap::new()));
            }
            Err(e) => return Err(e),
        };

        let loaded = match Cache::load_from_store(store.as_ref()) {
            Ok(loaded) => loaded,
            Err(e) if !persist => {
                tracing::error!("Error reading database {}: {}", path.display(), e);
                SymbolMap::new()
            }
            Err(e) => {
                if let Err(close_err) = store.close() {
                    tracing::warn!("Error closing database: {}", close_err);
                }
                return Err(e);
            }
        };
        log_loaded(loaded.len(), path);

        let mut seed = SymbolMap::new();
        if persist {
            seed = loaded.clone();
            Cache::merge_builtin(&mut seed, builtin);
        }
        Ok((Self::attached(store, persist, seed), loaded))
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    pub fn persists(&self) -> bool {
        self.persist && self.store.is_some()
    }

    /// The map reverse translation records into.
    pub fn learned(&self) -> Result<MutexGuard<'_, SymbolMap>> {
        self.learned
            .lock()
            .map_err(|_| EvrcatError::Store("learned map lock poisoned".to_string()))
    }

    /// Flushes the store's write-ahead log. Failures are logged.
    pub fn sync(&self) {
        if self.finished.load(Ordering::Acquire) {
            return;
        }
        if let Some(store) = &self.store {
            if let Err(e) = store.sync() {
                tracing::warn!("Error syncing database: {}", e);
            }
        }
    }

    /// Writes learned symbols (when persisting) and closes the store.
    ///
    /// Only the first call does any work. The store is closed even when the
    /// flush fails; the flush error is returned.
    pub fn finish(&self) -> Result<FinishOutcome> {
        if self.finished.swap(true, Ordering::AcqRel) {
            return Ok(FinishOutcome::AlreadyFinished);
        }
        let Some(store) = &self.store else {
            return Ok(FinishOutcome::Detached);
        };

        let flushed = if self.persist {
            self.learned()
                .and_then(|learned| Cache::flush_to_store(store.as_ref(), &learned))
        } else {
            Ok(0)
        };

        let closed = store.close();
        let flushed = flushed?;
        closed?;

        if self.persist {
            tracing::info!("Saved {} entries to database", flushed);
        }
        Ok(FinishOutcome::Closed { flushed })
    }
}

fn log_loaded(count: usize, path: &Path) {
    tracing::info!("Loaded {} entries from {}", count, path.display());
}
