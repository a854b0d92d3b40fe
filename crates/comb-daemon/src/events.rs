//! Ledger event emission.
//!
//! Committed mutations are announced on a broadcast channel so that other
//! services (notifications, leaderboards) can follow pool activity. Each
//! event carries a daemon-wide sequence number; a subscriber that lags and
//! drops events sees a gap.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    DaemonStarted,
    PoolCreated,
    PoolFunded,
    StrategyUpdated,
    RewardsCalculated,
    RewardsClaimed,
    PoolClosed,
}

/// One emitted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Position in the daemon's event stream, starting at 1.
    pub seq: u64,
    pub kind: LedgerEvent,
    /// Unix seconds, from the engine clock.
    pub timestamp: u64,
    pub payload: serde_json::Value,
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    last_seq: Arc<AtomicU64>,
}

impl EventBus {
    /// `capacity` events are buffered per subscriber before the oldest are
    /// dropped.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            last_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Stamp and broadcast an event. Returns its sequence number.
    pub fn emit(&self, kind: LedgerEvent, timestamp: u64, payload: serde_json::Value) -> u64 {
        let seq = self.last_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let event = Event {
            seq,
            kind,
            timestamp,
            payload,
        };
        if self.sender.send(event).is_err() {
            tracing::trace!(seq, ?kind, "no event subscribers");
        }
        seq
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Sequence number of the most recent event, 0 if none.
    pub fn sequence(&self) -> u64 {
        self.last_seq.load(Ordering::SeqCst)
    }
}
