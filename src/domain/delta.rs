// Per-tick change detection against the positions last sent to peers.

use super::state::{PeerId, PeerSnapshot, Position};
use std::collections::{BTreeSet, HashMap};

/// One changed peer inside a delta message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaEntry {
    pub id: PeerId,
    pub dx: i16,
    pub dy: i16,
}

impl DeltaEntry {
    pub fn new(id: PeerId, dx: i16, dy: i16) -> Self {
        Self { id, dx, dy }
    }
}

/// Result of diffing one snapshot.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeltaBatch {
    pub entries: Vec<DeltaEntry>,
    /// Set when some value did not fit in 16 bits and was clamped. Receivers are
    /// out of step until they get absolute positions again.
    pub overflowed: bool,
}

impl DeltaBatch {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Remembers the positions of the previous tick.
///
/// Peers seen for the first time are reported with their absolute coordinates in the
/// delta fields. Peers that vanished from the store are forgotten on the next diff.
#[derive(Debug, Default)]
pub struct DeltaTracker {
    last: HashMap<PeerId, Position>,
}

impl DeltaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diff(&mut self, snapshot: &[PeerSnapshot]) -> DeltaBatch {
        let present: BTreeSet<PeerId> = snapshot.iter().map(|peer| peer.id).collect();
        self.last.retain(|id, _| present.contains(id));

        let mut batch = DeltaBatch::default();
        for peer in snapshot {
            let current = peer.position;
            let (dx, dy) = match self.last.insert(peer.id, current) {
                None => (i64::from(current.x), i64::from(current.y)),
                Some(previous) if previous == current => continue,
                Some(previous) => (
                    i64::from(current.x) - i64::from(previous.x),
                    i64::from(current.y) - i64::from(previous.y),
                ),
            };

            let (dx, dx_clamped) = clamp_i16(dx);
            let (dy, dy_clamped) = clamp_i16(dy);
            batch.overflowed |= dx_clamped || dy_clamped;
            batch.entries.push(DeltaEntry::new(peer.id, dx, dy));
        }
        batch
    }

    pub fn tracked(&self) -> usize {
        self.last.len()
    }
}

fn clamp_i16(value: i64) -> (i16, bool) {
    match i16::try_from(value) {
        Ok(v) => (v, false),
        Err(_) if value < 0 => (i16::MIN, true),
        Err(_) => (i16::MAX, true),
    }
}
