//! Line-oriented TCP server.
//!
//! Each connection gets its own task. Every newline-terminated request line is
//! answered with one response line: the request with known hashes replaced by
//! their tokens, using the shared [`ReplacementTable`] only.

pub mod table;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use crate::error::{EvrcatError, Result};

pub use table::ReplacementTable;

/// Counters shared by all connection tasks.
#[derive(Debug, Default)]
pub struct ServerStats {
    accepted: AtomicU64,
    active: AtomicU64,
    lines: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub accepted: u64,
    pub active: u64,
    pub lines: u64,
}

impl ServerStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            active: self.active.load(Ordering::Relaxed),
            lines: self.lines.load(Ordering::Relaxed),
        }
    }
}

/// Bytes moved over one connection. `read` excludes line terminators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionTotals {
    pub read: usize,
    pub sent: usize,
    pub lines: usize,
}

pub struct CatServer {
    listener: TcpListener,
    table: Arc<ReplacementTable>,
    stats: Arc<ServerStats>,
}

impl CatServer {
    /// Binds the listener. Failure here is fatal for the caller.
    pub async fn bind(addr: SocketAddr, table: ReplacementTable) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| EvrcatError::ServerBind { addr, source })?;
        Ok(Self {
            listener,
            table: Arc::new(table),
            stats: Arc::new(ServerStats::default()),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn stats(&self) -> Arc<ServerStats> {
        self.stats.clone()
    }

    /// Accepts connections forever.
    pub async fn run(self) {
        self.run_until(std::future::pending::<()>()).await;
    }

    /// Accepts connections until `shutdown` resolves. Connections already
    /// being served are left to finish on their own.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) {
        match self.local_addr() {
            Ok(addr) => tracing::info!("Server started. Listening on {}", addr),
            Err(e) => tracing::warn!("Server started on unknown address: {}", e),
        }

        tokio::pin!(shutdown);
        loop {
            let accepted = tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => accepted,
            };

            let (socket, peer) = match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            self.stats.accepted.fetch_add(1, Ordering::Relaxed);
            self.stats.active.fetch_add(1, Ordering::Relaxed);
            let table = self.table.clone();
            let stats = self.stats.clone();

            tokio::spawn(async move {
                tracing::info!("Accepted connection from {}", peer);
                let (reader, writer) = socket.into_split();
                let (totals, result) = serve_lines(reader, writer, &table, &stats).await;
                if let Err(e) = result {
                    tracing::warn!("Connection from {} failed: {}", peer, e);
                }
                tracing::info!(
                    "Connection from {} closed. Read {} bytes, sent {} bytes",
                    peer,
                    totals.read,
                    totals.sent
                );
                stats.active.fetch_sub(1, Ordering::Relaxed);
            });
        }

        tracing::info!("Server stopped accepting connections");
    }
}

/// Serves one connection until end of stream or an I/O error.
///
/// Totals are returned even when the connection ends with an error.
pub async fn serve_lines<R, W>(
    reader: R,
    mut writer: W,
    table: &ReplacementTable,
    stats: &ServerStats,
) -> (ConnectionTotals, std::io::Result<()>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut totals = ConnectionTotals::default();
    let mut buf = Vec::new();

    let result = loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break Ok(()),
            Ok(_) => {}
            Err(e) => break Err(e),
        }

        let line = trim_line_end(&buf);
        totals.read += line.len();

        let mut response = table.replace(line);
        response.push(b'\n');

        if let Err(e) = writer.write_all(&response).await {
            break Err(e);
        }
        totals.sent += response.len();
        totals.lines += 1;
        stats.lines.fetch_add(1, Ordering::Relaxed);
    };

    let result = match result {
        Ok(()) => writer.shutdown().await,
        Err(e) => Err(e),
    };
    (totals, result)
}

/// Strips a trailing `\n` and then a trailing `\r`.
fn trim_line_end(buf: &[u8]) -> &[u8] {
    let line = buf.strip_suffix(b"\n").unwrap_or(buf);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::BUILTIN_SYMBOLS;

    fn table() -> ReplacementTable {
        ReplacementTable::from_builtin(&BUILTIN_SYMBOLS)
    }

    #[test]
    fn test_trim_line_end() {
        assert_eq!(trim_line_end(b"abc\r\n"), b"abc");
        assert_eq!(trim_line_end(b"abc\n"), b"abc");
        assert_eq!(trim_line_end(b"abc"), b"abc");
        assert_eq!(trim_line_end(b"\n"), b"");
    }

    #[tokio::test]
    async fn test_serve_lines_one_response_per_line() {
        let input: &[u8] = b"level '0xAC360E41E4EDE056'\r\nunknown 0xff360e41e4ede056\n\nlast";
        let mut output = Vec::new();
        let stats = ServerStats::default();

        let (totals, result) = serve_lines(input, &mut output, &table(), &stats).await;
        result.unwrap();

        let text = String::from_utf8(output).unwrap();
        assert_eq!(
            text,
            "level 'mnu_master'\nunknown 0xff360e41e4ede056\n\nlast\n"
        );
        assert_eq!(totals.lines, 4);
        assert_eq!(totals.sent, text.len());
        assert_eq!(
            totals.read,
            "level '0xAC360E41E4EDE056'".len() + "unknown 0xff360e41e4ede056".len() + "last".len()
        );
        assert_eq!(stats.snapshot().lines, 4);
    }

    #[tokio::test]
    async fn test_serve_lines_keeps_invalid_utf8() {
        let input: &[u8] = b"caf\xe9 0xac360e41e4ede056\n\xff\n";
        let mut output = Vec::new();

        let (totals, result) =
            serve_lines(input, &mut output, &table(), &ServerStats::default()).await;
        result.unwrap();

        assert_eq!(output, b"caf\xe9 mnu_master\n\xff\n".to_vec());
        assert_eq!(totals.lines, 2);
    }

    #[tokio::test]
    async fn test_serve_lines_empty_stream() {
        let input: &[u8] = b"";
        let mut output = Vec::new();
        let (totals, result) =
            serve_lines(input, &mut output, &table(), &ServerStats::default()).await;
        result.unwrap();
        assert!(output.is_empty());
        assert_eq!(totals, ConnectionTotals::default());
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let first = CatServer::bind("127.0.0.1:0".parse().unwrap(), table())
            .await
            .unwrap();
        let addr = first.local_addr().unwrap();

        let second = CatServer::bind(addr, table()).await;
        assert!(matches!(second, Err(EvrcatError::ServerBind { .. })));
    }
}
