//! Periodic sync task
//!
//! Runs a cycle on every tick of a fixed interval until stopped. Ticks that
//! fall due while a cycle is still running are skipped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::sync::{SyncOutcome, SyncReconciler};

/// Handle to the background sync loop
pub struct SyncTask {
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl SyncTask {
    /// Spawn the loop; the first cycle runs immediately
    pub fn start(reconciler: Arc<SyncReconciler>, period: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            tracing::info!("Periodic sync started (every {:?})", period);
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        // Runs to completion; shutdown is only observed between cycles
                        if let SyncOutcome::Skipped = reconciler.sync_now().await {
                            tracing::debug!("Periodic sync skipped, cycle already running");
                        }
                    }
                }
            }

            tracing::info!("Periodic sync stopped");
        });

        Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Stop the loop, waiting for an in-flight cycle to finish
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::error!("Sync task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for SyncTask {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}
