use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::tree::{RefreshBus, RefreshReason};

/// Repeating timer that publishes [`RefreshReason::AutoRefresh`].
///
/// At most one timer runs; restarting cancels the previous one first.
pub struct AutoRefreshScheduler {
    bus: Arc<RefreshBus>,
    running: Mutex<Option<(JoinHandle<()>, CancellationToken)>>,
}

impl AutoRefreshScheduler {
    pub fn new(bus: Arc<RefreshBus>) -> Self {
        Self {
            bus,
            running: Mutex::new(None),
        }
    }

    /// Cancel any running timer and start a new one. `interval_secs == 0` only cancels.
    pub async fn restart(&self, interval_secs: u64) {
        let mut running = self.running.lock().await;
        if let Some((handle, token)) = running.take() {
            token.cancel();
            handle.abort();
            debug!("Previous auto-refresh timer cancelled");
        }

        if interval_secs == 0 {
            return;
        }

        let period = Duration::from_secs(interval_secs);
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let bus = self.bus.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => bus.publish(RefreshReason::AutoRefresh),
                }
            }
        });

        info!(interval_secs, "Auto-refresh started");
        *running = Some((handle, token));
    }

    pub async fn stop(&self) {
        if let Some((handle, token)) = self.running.lock().await.take() {
            token.cancel();
            handle.abort();
            info!("Auto-refresh stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }
}
