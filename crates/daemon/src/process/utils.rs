use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub type ShutdownChannel = (JoinHandle<()>, watch::Sender<()>, watch::Receiver<()>);

/// Spawns a task that resolves on SIGINT, SIGTERM, or a programmatic send
///  on the returned sender, then fans the shutdown out to every receiver.
///  Receivers start draining right away; the server bounds the drain.
pub fn graceful_shutdown_blocker() -> std::io::Result<ShutdownChannel> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let (tx, rx) = watch::channel(());
    let signal_tx = tx.clone();
    let mut manual_rx = rx.clone();

    let handle = tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => {
                tracing::debug!("SIGINT received, draining requests");
            }
            _ = sigterm.recv() => {
                tracing::debug!("SIGTERM received, draining requests");
            }
            _ = manual_rx.changed() => {
                tracing::debug!("shutdown requested");
                return;
            }
        }

        let _ = signal_tx.send(());
    });

    Ok((handle, tx, rx))
}

/// Route panics through `tracing` so they land in the log file too
pub fn register_panic_logger() {
    std::panic::set_hook(Box::new(|panic| match panic.location() {
        Some(loc) => {
            tracing::error!(
                message = %panic,
                panic.file = loc.file(),
                panic.line = loc.line(),
                panic.column = loc.column(),
            );
        }
        None => tracing::error!(message = %panic),
    }));
}

pub fn report_build_info() {
    let build = common::prelude::build_info();

    tracing::info!(
        version = %build.version,
        profile = ?build.build_profile,
        features = ?build.build_features,
        "docverify daemon starting"
    );
}
