use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

/// Kind of change recorded by a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitKind {
    Put,
    Delete,
}

/// One committed key change, with a monotonic sequence number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitEvent {
    pub seq: u64,
    pub kind: CommitKind,
    pub key: String,
}

/// Broadcast log of committed changes. The store emits one event per
/// written key after a commit lands; subscribers that lag are dropped by
/// the broadcast channel, so this is an observation aid, not a journal.
#[derive(Clone)]
pub struct CommitLog {
    seq: Arc<AtomicU64>,
    sender: broadcast::Sender<CommitEvent>,
}

impl CommitLog {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1024);
        Self {
            seq: Arc::new(AtomicU64::new(0)),
            sender,
        }
    }

    /// Record one key change. Called by the store after a successful commit.
    pub fn emit(&self, kind: CommitKind, key: String) {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        // Ignore errors if no receivers are subscribed.
        let _ = self.sender.send(CommitEvent { seq, kind, key });
    }

    pub fn current_seq(&self) -> u64 {
        self.seq.load(Ordering::Relaxed)
    }

    /// Subscribe to receive new events as they are committed.
    pub fn subscribe(&self) -> broadcast::Receiver<CommitEvent> {
        self.sender.subscribe()
    }
}

impl Default for CommitLog {
    fn default() -> Self {
        Self::new()
    }
}
