//! Turns Ctrl-C / SIGTERM into a flag the pipeline polls between
//! steps, so an interrupted run still goes through cleanup.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use tracing::warn;

use crate::error::{DeployError, DeployResult};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Start listening for interrupts on a helper thread.
pub fn install() -> DeployResult<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()?;

    thread::Builder::new()
        .name("dockhand-signals".into())
        .spawn(move || runtime.block_on(listen()))?;
    Ok(())
}

async fn listen() {
    loop {
        if wait_for_signal().await.is_err() {
            return;
        }
        if INTERRUPTED.swap(true, Ordering::SeqCst) {
            warn!("Interrupt received again, waiting for cleanup to finish");
        } else {
            warn!("Interrupt received, stopping after the current step");
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigterm.recv() => Ok(()),
        res = tokio::signal::ctrl_c() => res,
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Whether an interrupt arrived.
#[must_use]
pub fn requested() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Fail with [`DeployError::Interrupted`] once an interrupt arrived.
pub fn check() -> DeployResult<()> {
    if requested() {
        Err(DeployError::Interrupted)
    } else {
        Ok(())
    }
}
