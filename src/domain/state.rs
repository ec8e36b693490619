// Domain-level peer identity and position types.

use std::fmt;

/// Identity of a connected peer. Travels as a single byte on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeerId(pub u8);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Last reported 2D coordinates of a peer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// Where every peer starts until its first update arrives.
    pub const ORIGIN: Position = Position { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// One row of a store snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerSnapshot {
    pub id: PeerId,
    pub position: Position,
}

impl PeerSnapshot {
    pub fn new(id: PeerId, position: Position) -> Self {
        Self { id, position }
    }
}
