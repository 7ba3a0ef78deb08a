use std::path::{Path, PathBuf};

use crate::error::{EvrcatError, Result};

/// `<user cache dir>/evrcat/lookup.db`, or `~/.cache/evrcat/lookup.db` when the
/// platform has no cache directory.
pub fn default_db_path() -> PathBuf {
    match dirs::cache_dir() {
        Some(dir) => dir.join("evrcat").join("lookup.db"),
        None => PathBuf::from("~/.cache/evrcat/lookup.db"),
    }
}

/// Expands a leading `~/` to the user's home directory.
pub fn expand_home(path: &Path) -> Result<PathBuf> {
    let Ok(rest) = path.strip_prefix("~") else {
        return Ok(path.to_path_buf());
    };
    let home = dirs::home_dir()
        .ok_or_else(|| EvrcatError::Config("failed to get home directory".to_string()))?;
    Ok(home.join(rest))
}
