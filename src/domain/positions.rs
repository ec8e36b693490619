// Authoritative table of peer positions.

use super::state::{PeerId, PeerSnapshot, Position};
use std::collections::BTreeMap;

/// Last-known position per registered peer, ordered by id.
#[derive(Debug, Default)]
pub struct PositionStore {
    entries: BTreeMap<PeerId, Position>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a peer at the origin. An existing entry is reset.
    pub fn insert(&mut self, id: PeerId) {
        self.entries.insert(id, Position::ORIGIN);
    }

    /// Overwrites a known peer's position. Unknown ids are ignored and return false.
    pub fn update(&mut self, id: PeerId, position: Position) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                *entry = position;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: PeerId) -> Option<Position> {
        self.entries.remove(&id)
    }

    pub fn get(&self, id: PeerId) -> Option<Position> {
        self.entries.get(&id).copied()
    }

    pub fn contains(&self, id: PeerId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> Vec<PeerSnapshot> {
        self.entries
            .iter()
            .map(|(id, position)| PeerSnapshot::new(*id, *position))
            .collect()
    }
}
