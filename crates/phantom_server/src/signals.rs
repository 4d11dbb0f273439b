//! Signal handling for graceful shutdown.
//!
//! A signal only raises a flag. The tick loop notices it, schedules the
//! shutdown countdown and despawns everything before exiting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;
use tracing::info;

/// Shared shutdown flags, cloned between the signal task and the tick loop.
#[derive(Debug, Clone, Default)]
pub struct ShutdownState {
    /// Set once a shutdown has been requested
    shutdown_initiated: Arc<AtomicBool>,
    /// Set once every phantom has been despawned
    shutdown_complete: Arc<AtomicBool>,
}

impl ShutdownState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::Acquire)
    }

    pub fn is_shutdown_complete(&self) -> bool {
        self.shutdown_complete.load(Ordering::Acquire)
    }

    /// Requests shutdown. The tick loop keeps running until its countdown ends.
    pub fn initiate_shutdown(&self) {
        if !self.shutdown_initiated.swap(true, Ordering::AcqRel) {
            info!("🛑 Shutdown initiated");
        }
    }

    pub fn complete_shutdown(&self) {
        self.shutdown_complete.store(true, Ordering::Release);
        info!("✅ Shutdown complete");
    }
}

/// Waits for SIGINT or SIGTERM (Ctrl+C on Windows) and flags `state`.
pub async fn wait_for_shutdown_signal(state: ShutdownState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => (),
            _ = sigterm.recv() => ()
        }
    }

    #[cfg(windows)]
    signal::ctrl_c().await?;

    info!("📡 Received shutdown signal - initiating graceful shutdown");
    state.initiate_shutdown();
    Ok(())
}
