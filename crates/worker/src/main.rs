// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! `hqw-worker`: the binary that wires a real transport, identity, and
//! local store to [`hqw_worker::WorkerRunner`] (spec.md §6).
//!
//! stdin/stdout carry the wire protocol in subprocess mode; stderr is for
//! human logs only, never parsed by HQ (spec.md §6). Mesh mode swaps stdio
//! for a TCP connection to `--hq-address`; reconnection policy there is
//! delegated to the mesh collaborator (spec.md §1 Non-goals, §4.2) so this
//! binary makes exactly one connection attempt per run.

use clap::Parser;
use hqw_adapters::{GitWorktreeManager, LlmClient, ProcessToolExecutor, ToolExecutor, UnconfiguredLlmClient, WorktreeManager};
use hqw_core::{Clock, SystemClock, WorkerId};
use hqw_crypto::{MasterKey, StoreCipher, WorkerIdentity};
use hqw_store::LocalStore;
use hqw_wire::Connection;
use hqw_worker::{BootError, Config, Mode, WorkerRunner};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const HEARTBEAT_INTERVAL_SECS: u64 = 10;

/// stderr stays human-readable for an operator attached to the process;
/// the daily-rotating file under `data_dir` is the durable record HQ's
/// operators tail after the fact (spec.md §6). Returns the
/// [`tracing_appender::non_blocking::WorkerGuard`] the caller must hold for
/// the process lifetime, or the file writer is dropped and logs stop.
fn setup_logging(data_dir: &Path) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(data_dir)?;
    let file_appender = tracing_appender::rolling::daily(data_dir, "worker.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let filter = tracing_subscriber::EnvFilter::from_default_env();

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}

fn main() -> ExitCode {
    let config = Config::parse();
    if let Err(e) = config.validate() {
        eprintln!("hqw-worker: {e}");
        return ExitCode::from(2);
    }

    // Held for the process lifetime: dropping it stops the non-blocking
    // file writer from flushing.
    let log_guard = match config.resolved_data_dir() {
        Some(data_dir) => match setup_logging(&data_dir) {
            Ok(guard) => Some(guard),
            Err(e) => {
                eprintln!("hqw-worker: failed to open log file, logging to stderr only: {e}");
                None
            }
        },
        None => None,
    };
    if log_guard.is_none() {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .init();
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("hqw-worker: failed to start async runtime: {e}");
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("hqw-worker: fatal: {e}");
            ExitCode::from(1)
        }
    }
}

async fn run(config: Config) -> Result<(), BootError> {
    let Some(data_dir) = config.resolved_data_dir() else {
        return Err(BootError::NoDataDir);
    };
    std::fs::create_dir_all(&data_dir).map_err(|e| BootError::Store(hqw_store::StoreError::from(e)))?;

    let worker_id = config.worker_id();
    let identity = WorkerIdentity::load_or_create(&data_dir.join("identity.json"), || WorkerId::new(worker_id.clone()))?;
    let master_key = MasterKey::load_or_create(&data_dir.join("master.key"))?;
    let cipher = StoreCipher::from_master_key(&master_key);
    let store = Arc::new(LocalStore::open(data_dir.join("worker.db"), cipher)?);

    info!(
        worker_id = %identity.worker_id.as_str(),
        public_key = %identity.box_public_key().to_base64(),
        mode = ?config.mode,
        "worker identity loaded"
    );

    let llm: Arc<dyn LlmClient> = Arc::new(UnconfiguredLlmClient);
    let tools: Arc<dyn ToolExecutor> = Arc::new(ProcessToolExecutor::new());
    let worktree: Arc<dyn WorktreeManager> = Arc::new(GitWorktreeManager::new());
    let runner = Arc::new(WorkerRunner::new(identity, store, llm, tools, worktree, SystemClock));

    match config.mode {
        Mode::Subprocess => {
            let conn = Arc::new(Connection::new(tokio::io::stdin(), tokio::io::stdout()));
            serve(runner, conn).await
        }
        Mode::Mesh => {
            let address = config.hq_address.clone().ok_or(BootError::NoMeshAddress)?;
            let stream = tokio::net::TcpStream::connect(&address).await.map_err(|e| {
                error!(address = %address, error = %e, "failed to connect to HQ mesh address");
                BootError::Connect(e)
            })?;
            let (read_half, write_half) = stream.into_split();
            let conn = Arc::new(Connection::new(read_half, write_half));
            serve(runner, conn).await
        }
    }
}

/// Boot, spawn the heartbeat ticker, then dispatch inbound messages until
/// `shutdown` or a fatal I/O error on `receive` (spec.md §4.6, §5). In
/// subprocess mode a `receive` error is fatal by contract (spec.md §4.2);
/// reconnecting a mesh transport is the mesh collaborator's job, so this
/// binary treats it the same way: exit and let the supervising process
/// decide whether to restart it.
async fn serve<R, W>(runner: Arc<WorkerRunner<SystemClock>>, conn: Arc<Connection<R, W>>) -> Result<(), BootError>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    runner.boot(&conn, VERSION.to_string()).await?;

    let heartbeat_stop = CancellationToken::new();
    let heartbeat_handle = {
        let runner = runner.clone();
        let conn = conn.clone();
        let stop = heartbeat_stop.clone();
        tokio::spawn(async move { heartbeat_loop(runner, conn, stop).await })
    };

    loop {
        let message = match conn.receive().await {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "connection closed, shutting down");
                break;
            }
        };

        match runner.handle_message(&conn, message.payload).await {
            Ok(true) => break,
            Ok(false) => {}
            Err(e) => warn!(error = %e, "error handling inbound message"),
        }
    }

    heartbeat_stop.cancel();
    let _ = heartbeat_handle.await;
    Ok(())
}

async fn heartbeat_loop<R, W>(runner: Arc<WorkerRunner<SystemClock>>, conn: Arc<Connection<R, W>>, stop: CancellationToken)
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let clock = SystemClock;
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = runner.snapshot();
                let result = conn
                    .send_heartbeat(
                        runner.worker_id(),
                        snapshot.state,
                        snapshot.objective_id,
                        snapshot.session_id,
                        snapshot.iteration,
                        snapshot.tokens_input,
                        snapshot.tokens_output,
                        runner.uptime_secs(),
                        clock.epoch_ms(),
                    )
                    .await;
                if let Err(e) = result {
                    warn!(error = %e, "failed to send heartbeat");
                }
            }
            _ = stop.cancelled() => break,
        }
    }
}
