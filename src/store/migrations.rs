//! Versioned schema migrations for the symbol store.
//!
//! The applied version lives in the `meta` table under `schema_version`.
//! Each migration runs exactly once, inside the caller's connection.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;

/// Current schema version. Increment when adding new migrations.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

type MigrationFn = fn(&Connection) -> Result<()>;

/// All migrations in order. Index + 1 = version number.
const MIGRATIONS: &[MigrationFn] = &[migration_v1_hash_partition, migration_v2_learned_at];

/// Runs all pending migrations on the database.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    for (idx, migration) in MIGRATIONS.iter().enumerate() {
        let version = (idx + 1) as u32;
        if version > current_version {
            tracing::debug!("Applying store migration v{}", version);
            migration(conn)?;
            set_schema_version(conn, version)?;
        }
    }

    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<u32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS meta (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
        [],
    )?;

    let version: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    Ok(version.and_then(|v| v.parse().ok()).unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: u32) -> Result<()> {
    conn.execute(
        "INSERT INTO meta (key, value) VALUES ('schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![version.to_string()],
    )?;
    Ok(())
}

/// v1: the `hashes` partition. Key is the 8-byte LE symbol, value the token bytes.
fn migration_v1_hash_partition(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS hashes (
            key BLOB PRIMARY KEY,
            value BLOB NOT NULL
        ) WITHOUT ROWID;
        "#,
    )?;
    Ok(())
}

/// v2: records when an entry was last written, for pruning stale entries by hand.
fn migration_v2_learned_at(conn: &Connection) -> Result<()> {
    let has_column = conn
        .query_row(
            "SELECT COUNT(*) FROM pragma_table_info('hashes') WHERE name = 'learned_at'",
            [],
            |row| row.get::<_, i64>(0),
        )
        .map(|count| count > 0)
        .unwrap_or(false);

    if !has_column {
        conn.execute(
            "ALTER TABLE hashes ADD COLUMN learned_at INTEGER NOT NULL DEFAULT 0",
            [],
        )?;
    }
    Ok(())
}
