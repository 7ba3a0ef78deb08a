use std::net::SocketAddr;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvrcatError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Symbol table error: {0}")]
    SymbolTable(#[from] serde_json::Error),

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Store is closed")]
    StoreClosed,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to bind {addr}: {source}")]
    ServerBind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, EvrcatError>;
