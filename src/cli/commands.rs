use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::Context;

use evrcat::{
    runner, Cache, CatServer, Config, LineTransformer, ReplacementTable, RunSummary,
    StoreSession, SymbolCodec, BUILTIN_SYMBOLS,
};

/// Serves forward translations over TCP until interrupted.
pub async fn run_server(port: u16) -> anyhow::Result<()> {
    let table = ReplacementTable::from_builtin(&BUILTIN_SYMBOLS);
    tracing::info!("Loaded {} entries from built-in symbol cache", table.len());

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let server = CatServer::bind(addr, table).await?;
    let stats = server.stats();

    server.run_until(shutdown_signal()).await;

    let snapshot = stats.snapshot();
    tracing::info!(
        "Served {} lines over {} connections",
        snapshot.lines,
        snapshot.accepted
    );
    Ok(())
}

/// Translates the configured inputs to stdout.
///
/// The store is closed exactly once: by this function after the last input,
/// or by the signal listener, which then exits the process.
pub async fn run_cat(config: Config) -> anyhow::Result<RunSummary> {
    let (session, loaded) = StoreSession::open(&config, &BUILTIN_SYMBOLS)?;
    let session = Arc::new(session);

    let signal_session = session.clone();
    let listener = tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received");
        if let Err(e) = signal_session.finish() {
            tracing::error!("Error closing database: {}", e);
        }
        std::process::exit(0);
    });

    let worker_session = session.clone();
    let result = tokio::task::spawn_blocking(move || {
        let mut transformer =
            LineTransformer::new(SymbolCodec::default(), Cache::from_map(loaded))
                .with_direction(config.direction)
                .with_uppercase(config.uppercase);
        let stdout = io::stdout();
        let mut out = stdout.lock();
        runner::run(&config, &mut transformer, &worker_session, &mut out)
    })
    .await
    .context("translation worker stopped unexpectedly");

    listener.abort();
    if let Err(e) = session.finish() {
        tracing::error!("Error closing database: {}", e);
    }

    let summary = result?.context("translation aborted")?;
    tracing::debug!(
        "Translated {} lines from {} inputs ({} skipped)",
        summary.lines,
        summary.inputs,
        summary.skipped
    );
    Ok(summary)
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
