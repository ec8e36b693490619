// Shared position store and connection registry.

use super::types::{FanOutReport, JoinError, Outbound, SendOutcome};
use crate::domain::{IdAllocator, PeerId, PeerSnapshot, Position, PositionStore};
use crate::interface_adapters::protocol::ServerMessage;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::error::TrySendError;

struct Tables {
    ids: IdAllocator,
    positions: PositionStore,
    connections: BTreeMap<PeerId, Outbound>,
}

/// Result of admitting a new peer.
#[derive(Debug)]
pub struct Admission {
    pub id: PeerId,
    /// Everyone registered before this peer, as listed in its welcome.
    pub others: Vec<PeerSnapshot>,
    /// Delivery of the join announcement to those peers.
    pub announced: FanOutReport,
}

/// Position Store and Connection Registry behind a single lock.
///
/// A peer is in both tables or in neither. The lock is never held across an await;
/// fan-out iterates a copied view of the registry taken up front, so joins and
/// leaves during a pass only show up on the next one.
pub struct SyncState {
    tables: Mutex<Tables>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncState {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables {
                ids: IdAllocator::new(),
                positions: PositionStore::new(),
                connections: BTreeMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn next_id(&self) -> Option<PeerId> {
        self.lock().ids.next_id()
    }

    /// Registers a peer at the origin and returns everyone who was there before it.
    pub fn register(&self, id: PeerId, channel: Outbound) -> Vec<PeerSnapshot> {
        let mut tables = self.lock();
        register_locked(&mut tables, id, channel)
    }

    /// Allocates an id, queues the welcome, registers and queues the join announcement
    /// for everyone else, all under one lock.
    ///
    /// The welcome is queued before the channel becomes visible to fan-out, so it is
    /// always the first message the peer receives. The join reaches older peers before
    /// any broadcast can mention the newcomer, and a peer admitted later sees the
    /// newcomer in its welcome only, never as a join.
    pub fn admit(&self, channel: Outbound) -> Result<Admission, JoinError> {
        let mut tables = self.lock();
        let id = tables.ids.next_id().ok_or(JoinError::IdsExhausted)?;

        let others = tables.positions.snapshot();
        let welcome = ServerMessage::Welcome {
            assigned_id: id,
            peers: others.clone(),
        }
        .encode();
        // A fresh queue has room; only a dropped receiver can fail here.
        if channel.try_send(welcome).is_err() {
            return Err(JoinError::ChannelClosed);
        }

        register_locked(&mut tables, id, channel);

        let join = ServerMessage::Join {
            id,
            position: Position::ORIGIN,
        }
        .encode();
        let mut announced = FanOutReport::default();
        for (peer, outbound) in tables.connections.iter().filter(|(peer, _)| **peer != id) {
            announced.record(*peer, send_best_effort(outbound, join.clone()));
        }

        Ok(Admission {
            id,
            others,
            announced,
        })
    }

    /// Overwrites a peer's position. Returns false for ids no longer registered.
    pub fn update(&self, id: PeerId, position: Position) -> bool {
        self.lock().positions.update(id, position)
    }

    /// Removes the peer from both tables. The channel is dropped, not closed.
    pub fn deregister(&self, id: PeerId) -> bool {
        let mut tables = self.lock();
        let had_position = tables.positions.remove(id).is_some();
        let had_channel = tables.connections.remove(&id).is_some();
        had_position || had_channel
    }

    pub fn snapshot(&self) -> Vec<PeerSnapshot> {
        self.lock().positions.snapshot()
    }

    pub fn position(&self, id: PeerId) -> Option<Position> {
        self.lock().positions.get(id)
    }

    pub fn is_registered(&self, id: PeerId) -> bool {
        let tables = self.lock();
        tables.positions.contains(id) && tables.connections.contains_key(&id)
    }

    pub fn peer_count(&self) -> usize {
        self.lock().connections.len()
    }

    /// Copied view of the registry for one fan-out pass.
    pub fn channels(&self) -> Vec<(PeerId, Outbound)> {
        self.lock()
            .connections
            .iter()
            .map(|(id, channel)| (*id, channel.clone()))
            .collect()
    }

    pub fn fan_out(&self, payload: &Bytes) -> FanOutReport {
        self.fan_out_except(payload, None)
    }

    /// Best-effort send to every registered peer except `skip`.
    pub fn fan_out_except(&self, payload: &Bytes, skip: Option<PeerId>) -> FanOutReport {
        let mut report = FanOutReport::default();
        for (id, channel) in self.channels() {
            if Some(id) == skip {
                continue;
            }
            report.record(id, send_best_effort(&channel, payload.clone()));
        }
        report
    }
}

fn register_locked(tables: &mut Tables, id: PeerId, channel: Outbound) -> Vec<PeerSnapshot> {
    let others = tables.positions.snapshot();
    tables.positions.insert(id);
    tables.connections.insert(id, channel);
    others
}

fn send_best_effort(channel: &Outbound, payload: Bytes) -> SendOutcome {
    match channel.try_send(payload) {
        Ok(()) => SendOutcome::Delivered,
        Err(TrySendError::Full(_)) => SendOutcome::Lagged,
        Err(TrySendError::Closed(_)) => SendOutcome::Closed,
    }
}
