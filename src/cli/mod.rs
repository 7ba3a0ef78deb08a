mod commands;

use std::path::Path;

use clap::Parser;

use evrcat::{Config, Direction, Input};

pub use commands::{run_cat, run_server};

#[derive(Parser, Debug)]
#[command(name = "evrcat")]
#[command(about = "Concatenate FILE(s) to standard output, replacing hashes with tokens.")]
#[command(version)]
#[command(override_usage = "evrcat [OPTION]... [FILE]...")]
#[command(after_long_help = r#"
With no FILE, or when FILE is -, read standard input.

EXAMPLES:
    # Replace known hashes in a game log
    evrcat game.log

    # Hash tokens and remember them for later runs
    echo "mnu_master lobby_arena" | evrcat --reverse --update-db

    # Serve translations over TCP
    evrcat --server 7777
"#)]
pub struct Cli {
    /// Replace tokens with hashes
    #[arg(long)]
    pub reverse: bool,

    /// Use uppercase hexadecimal strings
    #[arg(long)]
    pub uppercase: bool,

    /// Load cache database from PATH (empty to run without one)
    #[arg(long, value_name = "PATH")]
    pub db_path: Option<String>,

    /// Update the database (only works with --reverse)
    #[arg(long)]
    pub update_db: bool,

    /// Run as a server on PORT (reverse not supported)
    #[arg(long, value_name = "PORT", conflicts_with = "reverse")]
    pub server: Option<u16>,

    /// Files to read; - reads standard input
    #[arg(value_name = "FILE")]
    pub files: Vec<String>,
}

impl Cli {
    pub fn into_config(self) -> evrcat::Result<Config> {
        let config = Config {
            direction: if self.reverse {
                Direction::Reverse
            } else {
                Direction::Forward
            },
            uppercase: self.uppercase,
            db_path: Config::resolve_db_path(self.db_path.as_deref().map(Path::new)),
            update_db: self.update_db,
            server_port: self.server,
            inputs: self.files.iter().map(|f| Input::from_arg(f)).collect(),
        };
        config.validate()?;
        Ok(config)
    }
}
