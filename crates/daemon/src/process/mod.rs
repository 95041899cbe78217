pub mod utils;

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use futures::future::join_all;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::http_server;
use crate::service_state::StateSetupError;
use crate::{ServiceConfig, ServiceState};

const FINAL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
const LOG_FILE_NAME: &str = "docverify.log";

/// Handle for stopping a running daemon.
pub struct ShutdownHandle {
    graceful_waiter: tokio::task::JoinHandle<()>,
    handles: Vec<tokio::task::JoinHandle<()>>,
    shutdown_tx: watch::Sender<()>,
}

impl ShutdownHandle {
    /// Block until the service shuts down (via signal or [`Self::shutdown`]).
    pub async fn wait(self) {
        shutdown_and_join(self.graceful_waiter, self.handles).await;
    }

    /// Trigger shutdown programmatically.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error("failed to install signal handlers: {0}")]
    Signals(#[from] std::io::Error),
    #[error("failed to bind API listener on {0}: {1}")]
    Bind(SocketAddr, std::io::Error),
    #[error("error creating server state: {0}")]
    State(#[from] StateSetupError),
}

fn env_filter(level: tracing::Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Install the stdout subscriber, plus a daily-rolling file when a log
///  directory is configured. The returned guards flush on drop.
fn init_logging(service_config: &ServiceConfig) -> Vec<WorkerGuard> {
    let mut guards = Vec::new();

    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    guards.push(stdout_guard);
    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(stdout_writer)
        .with_filter(env_filter(service_config.log_level));

    let file_layer = service_config
        .log_dir
        .as_deref()
        .and_then(file_writer)
        .map(|(writer, guard)| {
            guards.push(guard);
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_span_events(FmtSpan::CLOSE)
                .with_filter(env_filter(service_config.log_level))
        });

    // An absent file layer is a no-op
    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .init();

    utils::register_panic_logger();
    utils::report_build_info();

    guards
}

fn file_writer(
    log_dir: &Path,
) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        eprintln!("Warning: cannot create log directory {:?}: {}", log_dir, e);
        return None;
    }
    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    Some(tracing_appender::non_blocking(appender))
}

/// Wait for shutdown and join all handles with timeout.
async fn shutdown_and_join(
    graceful_waiter: tokio::task::JoinHandle<()>,
    handles: Vec<tokio::task::JoinHandle<()>>,
) {
    let _ = graceful_waiter.await;

    if timeout(FINAL_SHUTDOWN_TIMEOUT, join_all(handles))
        .await
        .is_err()
    {
        tracing::error!(
            "Failed to shut down within {} seconds",
            FINAL_SHUTDOWN_TIMEOUT.as_secs()
        );
        std::process::exit(4);
    }
}

/// Build the service state and spawn the API server.
///
/// Dropping the returned `ShutdownHandle` does not stop the service.
pub async fn start_service(
    service_config: &ServiceConfig,
) -> Result<(ServiceState, ShutdownHandle), StartError> {
    let (graceful_waiter, shutdown_tx, shutdown_rx) = utils::graceful_shutdown_blocker()?;
    let state = ServiceState::from_config(service_config).await?;

    // Bind before spawning so a taken port fails startup instead of the task
    let api_addr = SocketAddr::from(([0, 0, 0, 0], service_config.api_port));
    let listener = TcpListener::bind(api_addr)
        .await
        .map_err(|e| StartError::Bind(api_addr, e))?;
    let api_state = state.clone();
    let api_config = http_server::Config::new(api_addr);
    let api_handle = tokio::spawn(async move {
        if let Err(e) = http_server::run_api(listener, api_config, api_state, shutdown_rx).await {
            tracing::error!("API server error: {}", e);
        }
    });

    tracing::info!(
        backend = state.documents().store().backend(),
        scheme = %state.documents().scheme(),
        read_only = state.is_read_only(),
        "Running: API on port {}",
        service_config.api_port
    );

    let handle = ShutdownHandle {
        graceful_waiter,
        handles: vec![api_handle],
        shutdown_tx,
    };

    Ok((state, handle))
}

/// Spawns the daemon service and blocks until a shutdown signal is received.
pub async fn spawn_service(service_config: &ServiceConfig) {
    let _guards = init_logging(service_config);
    let handle = match start_service(service_config).await {
        Ok((_, handle)) => handle,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(3);
        }
    };
    handle.wait().await;
}
