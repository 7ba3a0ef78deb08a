use std::path::{Path, PathBuf};

use crate::error::{EvrcatError, Result};
use crate::store::default_db_path;
use crate::transform::Direction;

/// An input stream named on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Stdin,
    File(PathBuf),
}

impl Input {
    /// `-` means standard input.
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            Self::Stdin
        } else {
            Self::File(PathBuf::from(arg))
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Self::Stdin => "-".to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

/// Run configuration, built once from the command line.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub direction: Direction,
    pub uppercase: bool,
    /// `None` runs without a store.
    pub db_path: Option<PathBuf>,
    pub update_db: bool,
    pub server_port: Option<u16>,
    pub inputs: Vec<Input>,
}

impl Config {
    /// Maps the raw `--db-path` value: absent selects the default location,
    /// an empty string disables the store.
    pub fn resolve_db_path(raw: Option<&Path>) -> Option<PathBuf> {
        match raw {
            None => Some(default_db_path()),
            Some(path) if path.as_os_str().is_empty() => None,
            Some(path) => Some(path.to_path_buf()),
        }
    }

    /// Learned symbols are written back only in reverse+update mode.
    pub fn persist_learned(&self) -> bool {
        self.direction == Direction::Reverse && self.update_db
    }

    /// Inputs in order; standard input when none were given.
    pub fn inputs(&self) -> Vec<Input> {
        if self.inputs.is_empty() {
            vec![Input::Stdin]
        } else {
            self.inputs.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_port.is_some() && self.direction == Direction::Reverse {
            return Err(EvrcatError::Config(
                "--server does not support --reverse".to_string(),
            ));
        }
        if self.update_db && self.direction != Direction::Reverse {
            tracing::warn!("--update-db only works with --reverse; ignoring it");
        }
        Ok(())
    }
}
