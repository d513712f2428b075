use std::sync::{Arc, PoisonError, RwLock, Weak};

use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    /// Operator asked for it
    Manual,
    /// A save/delete/activate/deactivate succeeded
    Mutation,
    /// Auto-refresh timer tick
    AutoRefresh,
    Connected,
    Reset,
}

/// Something that must be invalidated synchronously when a refresh is published
pub trait RefreshTarget: Send + Sync {
    fn on_refresh(&self, reason: RefreshReason);
}

/// Explicit refresh channel.
///
/// Publishers (mutation handlers, the auto-refresh timer, the session) call
/// [`RefreshBus::publish`]. Attached targets are invalidated before `publish`
/// returns; async observers get the reason through [`RefreshBus::subscribe`].
pub struct RefreshBus {
    tx: broadcast::Sender<RefreshReason>,
    targets: RwLock<Vec<Weak<dyn RefreshTarget>>>,
}

impl Default for RefreshBus {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            tx,
            targets: RwLock::new(Vec::new()),
        }
    }

    pub fn attach<T: RefreshTarget + 'static>(&self, target: &Arc<T>) {
        let target: Arc<dyn RefreshTarget> = target.clone();
        let weak = Arc::downgrade(&target);
        self.targets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(weak);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RefreshReason> {
        self.tx.subscribe()
    }

    pub fn publish(&self, reason: RefreshReason) {
        let live: Vec<_> = {
            let mut targets = self.targets.write().unwrap_or_else(PoisonError::into_inner);
            targets.retain(|t| t.strong_count() > 0);
            targets.iter().filter_map(Weak::upgrade).collect()
        };
        for target in live {
            target.on_refresh(reason);
        }

        // No receivers is fine
        let _ = self.tx.send(reason);
        debug!(?reason, "Refresh published");
    }
}
