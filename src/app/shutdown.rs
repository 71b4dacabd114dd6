//! Graceful shutdown handling for the process.
//!
//! One manager is shared by the signal listener, the control plane (as its
//! graceful-shutdown future) and `main`, which stops the simulation worker
//! once the server has drained.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use tokio::sync::Notify;

/// Manages graceful shutdown of the process.
pub struct ShutdownManager {
    shutdown_requested: AtomicBool,
    notify: Notify,
    exit_code: AtomicI32,
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownManager {
    /// Creates a new shutdown manager.
    pub fn new() -> Self {
        Self {
            shutdown_requested: AtomicBool::new(false),
            notify: Notify::new(),
            exit_code: AtomicI32::new(0),
        }
    }

    /// Requests shutdown and wakes everything waiting on it.
    pub fn request_shutdown(&self) {
        if !self.shutdown_requested.swap(true, Ordering::SeqCst) {
            tracing::info!("Shutdown requested");
        }
        self.notify.notify_waiters();
    }

    /// Checks if shutdown has been requested.
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    /// Resolves once shutdown has been requested, including before the call.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_shutdown_requested() {
                return;
            }
            notified.await;
        }
    }

    /// Sets the exit code.
    pub fn set_exit_code(&self, code: i32) {
        self.exit_code.store(code, Ordering::SeqCst);
    }

    /// Gets the exit code.
    pub fn exit_code(&self) -> i32 {
        self.exit_code.load(Ordering::SeqCst)
    }
}
