use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{EvrcatError, Result};
use crate::store::migrations::run_migrations;
use crate::store::{expand_home, SymbolStore};
use crate::symbol::{Symbol, SymbolMap};

/// Longest wait for another process holding the database lock.
const LOCK_TIMEOUT: Duration = Duration::from_secs(1);

pub struct SqliteStore {
    conn: Mutex<Option<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Opens (creating if needed) the store at `db_path`.
    ///
    /// A leading `~/` is expanded and missing parent directories are created.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let path = expand_home(db_path.as_ref())?;
        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                create_private_dir(parent)?;
            }
        }

        let conn = Connection::open(&path)?;
        conn.busy_timeout(LOCK_TIMEOUT)?;
        Self::configure_pragmas(&conn)?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path: Some(path),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure_pragmas(&conn)?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path: None,
        })
    }

    /// Resolved file path, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// - WAL mode: readers in other processes do not block the final flush
    /// - NORMAL synchronous: durable at checkpoint, cheaper per commit
    fn configure_pragmas(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            "#,
        )?;
        Ok(())
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| EvrcatError::Store("connection lock poisoned".to_string()))?;
        let conn = guard.as_mut().ok_or(EvrcatError::StoreClosed)?;
        f(conn)
    }
}

impl SymbolStore for SqliteStore {
    fn load_all(&self) -> Result<SymbolMap> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT key, value FROM hashes")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?;

            let mut symbols = SymbolMap::new();
            for row in rows {
                let (key, value) = row?;
                let Some(symbol) = Symbol::from_le_slice(&key) else {
                    tracing::warn!("Skipping store entry with {}-byte key", key.len());
                    continue;
                };
                match String::from_utf8(value) {
                    Ok(token) => {
                        symbols.insert(symbol, token);
                    }
                    Err(_) => {
                        tracing::warn!("Skipping store entry {} with non-UTF-8 token", symbol);
                    }
                }
            }
            Ok(symbols)
        })
    }

    fn write_all(&self, entries: &SymbolMap) -> Result<usize> {
        let learned_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;

        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO hashes (key, value, learned_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        learned_at = excluded.learned_at",
                )?;
                for (symbol, token) in entries {
                    stmt.execute(params![
                        symbol.to_le_bytes().to_vec(),
                        token.as_bytes(),
                        learned_at
                    ])?;
                }
            }
            tx.commit()?;
            Ok(entries.len())
        })
    }

    fn len(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM hashes", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    fn sync(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.query_row("PRAGMA wal_checkpoint(PASSIVE)", [], |_| Ok(()))?;
            Ok(())
        })
    }

    fn close(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| EvrcatError::Store("connection lock poisoned".to_string()))?
            .take();
        match conn {
            Some(conn) => conn.close().map_err(|(_, e)| EvrcatError::Database(e)),
            None => Ok(()),
        }
    }

    fn is_closed(&self) -> bool {
        self.conn.lock().map(|guard| guard.is_none()).unwrap_or(true)
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)?;
    Ok(())
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_map() -> SymbolMap {
        let mut map = SymbolMap::new();
        map.insert(Symbol::new(0xac36_0e41_e4ed_e056), "mnu_master".to_string());
        map.insert(Symbol::new(0x667f_eb11_0569_d3a3), "emote_vrml_a".to_string());
        map
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested/cache/lookup.db");

        let store = SqliteStore::open(&db_path).unwrap();

        assert!(db_path.exists());
        assert_eq!(store.path(), Some(db_path.as_path()));
        assert_eq!(store.len().unwrap(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_created_directory_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let parent = dir.path().join("evrcat");
        SqliteStore::open(parent.join("lookup.db")).unwrap();

        let mode = fs::metadata(&parent).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn test_write_and_reload_across_connections() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("lookup.db");

        let store = SqliteStore::open(&db_path).unwrap();
        assert_eq!(store.write_all(&sample_map()).unwrap(), 2);
        store.close().unwrap();

        let reopened = SqliteStore::open(&db_path).unwrap();
        assert_eq!(reopened.load_all().unwrap(), sample_map());
    }

    #[test]
    fn test_write_overwrites_existing_key() {
        let store = SqliteStore::in_memory().unwrap();
        store.write_all(&sample_map()).unwrap();

        let mut update = SymbolMap::new();
        update.insert(Symbol::new(0xac36_0e41_e4ed_e056), "mnu_renamed".to_string());
        store.write_all(&update).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(
            loaded.get(&Symbol::new(0xac36_0e41_e4ed_e056)).map(String::as_str),
            Some("mnu_renamed")
        );
    }

    #[test]
    fn test_keys_are_little_endian() {
        let store = SqliteStore::in_memory().unwrap();
        let mut map = SymbolMap::new();
        map.insert(Symbol::new(0x0102_0304_0506_0708), "level".to_string());
        store.write_all(&map).unwrap();

        let key: Vec<u8> = store
            .with_conn(|conn| Ok(conn.query_row("SELECT key FROM hashes", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(key, vec![8, 7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO hashes (key, value) VALUES (?1, ?2)",
                    params![vec![1u8, 2, 3], b"short_key".to_vec()],
                )?;
                conn.execute(
                    "INSERT INTO hashes (key, value) VALUES (?1, ?2)",
                    params![7u64.to_le_bytes().to_vec(), vec![0xffu8, 0xfe]],
                )?;
                conn.execute(
                    "INSERT INTO hashes (key, value) VALUES (?1, ?2)",
                    params![9u64.to_le_bytes().to_vec(), b"valid".to_vec()],
                )?;
                Ok(())
            })
            .unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get(&Symbol::new(9)).map(String::as_str), Some("valid"));
    }

    #[test]
    fn test_close_is_idempotent() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(!store.is_closed());
        store.close().unwrap();
        store.close().unwrap();
        assert!(store.is_closed());
        assert!(matches!(store.load_all(), Err(EvrcatError::StoreClosed)));
    }

    #[test]
    fn test_sync_on_file_store() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("lookup.db")).unwrap();
        store.write_all(&sample_map()).unwrap();
        store.sync().unwrap();
    }
}
