use dashmap::DashSet;
use tokio::sync::Notify;

/// Keys of the background workers currently in flight.
///
/// Used to avoid starting a second lookup for a player that already has one
/// running. Duplicate lookups are idempotent, so this only saves requests.
#[derive(Debug, Default)]
pub struct PendingRequests {
    inflight: DashSet<String>,
    finished: Notify,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` as in flight. Returns `false` if it already was.
    pub fn try_begin(&self, key: &str) -> bool {
        self.inflight.insert(key.to_string())
    }

    pub fn finish(&self, key: &str) {
        self.inflight.remove(key);
        self.finished.notify_waiters();
    }

    /// Resolves once nothing is in flight.
    pub async fn drained(&self) {
        loop {
            let finished = self.finished.notified();
            if self.inflight.is_empty() {
                return;
            }
            finished.await;
        }
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.inflight.contains(key)
    }

    pub fn len(&self) -> usize {
        self.inflight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inflight.is_empty()
    }
}
