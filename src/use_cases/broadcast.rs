use super::state::SyncState;
use super::types::{FanOutReport, SyncSettings};
use crate::domain::DeltaTracker;
use crate::interface_adapters::protocol::ServerMessage;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// What one tick sent.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub delta: Option<FanOutReport>,
    pub full_sync: Option<FanOutReport>,
    /// A full sync went out early because a delta had to be clamped.
    pub forced_resync: bool,
}

/// Delta and full-sync scheduling, one call per tick.
pub struct BroadcastLoop {
    state: Arc<SyncState>,
    tracker: DeltaTracker,
    full_sync_interval: Duration,
    last_full_sync: Instant,
}

impl BroadcastLoop {
    pub fn new(state: Arc<SyncState>, full_sync_interval: Duration, now: Instant) -> Self {
        Self {
            state,
            tracker: DeltaTracker::new(),
            full_sync_interval,
            last_full_sync: now,
        }
    }

    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        let snapshot = self.state.snapshot();
        let batch = self.tracker.diff(&snapshot);
        let overflowed = batch.overflowed;
        if !batch.is_empty() {
            let payload = ServerMessage::Delta(batch.entries).encode();
            outcome.delta = Some(self.state.fan_out(&payload));
        }

        let due = now.saturating_duration_since(self.last_full_sync) >= self.full_sync_interval;
        if due || overflowed {
            // Re-read so the full sync never carries a position older than the store.
            let peers = self.state.snapshot();
            if !peers.is_empty() {
                let payload = ServerMessage::FullSync(peers).encode();
                outcome.full_sync = Some(self.state.fan_out(&payload));
                outcome.forced_resync = !due;
                self.last_full_sync = now;
            }
        }

        outcome
    }
}

/// Runs for the life of the process; individual send failures never stop it.
pub async fn broadcast_task(state: Arc<SyncState>, settings: SyncSettings) {
    let mut interval = tokio::time::interval(settings.tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut broadcast = BroadcastLoop::new(state, settings.full_sync_interval, Instant::now());

    info!(
        tick_ms = settings.tick_interval.as_millis() as u64,
        full_sync_ms = settings.full_sync_interval.as_millis() as u64,
        "broadcast loop started"
    );

    loop {
        interval.tick().await;
        let outcome = broadcast.tick(Instant::now());

        if outcome.forced_resync {
            debug!("delta overflowed 16 bits; sent early full sync");
        }
        for (kind, report) in [("delta", &outcome.delta), ("full_sync", &outcome.full_sync)] {
            if let Some(report) = report.as_ref().filter(|r| !r.is_clean()) {
                debug!(
                    kind,
                    delivered = report.delivered,
                    lagged = report.lagged.len(),
                    closed = report.closed.len(),
                    "fan-out incomplete"
                );
            }
        }
    }
}
