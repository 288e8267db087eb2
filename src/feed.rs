use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Tables a client may watch for changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTable {
    Groups,
    Projects,
    Tasks,
    Submissions,
}

/// A coarse, table-level change notification. Carries no row data:
/// subscribers re-fetch their own scope, which keeps every client
/// convergent with the database without a merge algorithm.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct ChangeEvent {
    pub table: ChangeTable,
}

/// Post-commit fanout of [`ChangeEvent`]s to subscribed clients.
///
/// Events are lossy hints. A publish with no subscribers, or a lagged
/// subscriber dropping events, never fails the write that produced it;
/// the cost is freshness until the next event, not correctness.
#[derive(Clone, Debug)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish a change for `table`. Call only after the write committed.
    pub fn publish(&self, table: ChangeTable) {
        let _ = self.tx.send(ChangeEvent { table });
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}
