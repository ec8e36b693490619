// Binary wire protocol shared with existing peers.
// All integers are little-endian; coordinates are i32 and deltas are i16.

use crate::domain::{DeltaEntry, PeerId, PeerSnapshot, Position};
use bytes::{Buf, BufMut, Bytes, BytesMut};

pub const MSG_JOIN: u8 = 0;
pub const MSG_DELTA: u8 = 1;
pub const MSG_WELCOME: u8 = 2;
pub const MSG_FULL_SYNC: u8 = 3;

/// Client updates carry no type tag: exactly `x: i32, y: i32`.
pub const CLIENT_UPDATE_LEN: usize = 8;
const JOIN_LEN: usize = 10;
const DELTA_ENTRY_LEN: usize = 5;
const PEER_ENTRY_LEN: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("empty frame")]
    Empty,
    #[error("expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },
    #[error("frame truncated: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },
    #[error("unknown message type {0}")]
    UnknownType(u8),
    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),
}

/// Absolute position report sent by a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientUpdate {
    pub x: i32,
    pub y: i32,
}

impl ClientUpdate {
    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        if frame.len() != CLIENT_UPDATE_LEN {
            return Err(DecodeError::WrongLength {
                expected: CLIENT_UPDATE_LEN,
                actual: frame.len(),
            });
        }
        let mut buf = frame;
        Ok(Self {
            x: buf.get_i32_le(),
            y: buf.get_i32_le(),
        })
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(CLIENT_UPDATE_LEN);
        buf.put_i32_le(self.x);
        buf.put_i32_le(self.y);
        buf.freeze()
    }
}

impl From<ClientUpdate> for Position {
    fn from(update: ClientUpdate) -> Self {
        Position::new(update.x, update.y)
    }
}

/// Messages the server sends to peers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    // Announces a newcomer to everyone already connected.
    Join { id: PeerId, position: Position },
    // Per-tick changes only.
    Delta(Vec<DeltaEntry>),
    // First message a newcomer receives: its id plus everyone else.
    Welcome {
        assigned_id: PeerId,
        peers: Vec<PeerSnapshot>,
    },
    // Periodic absolute positions of every registered peer.
    FullSync(Vec<PeerSnapshot>),
}

impl ServerMessage {
    pub fn encoded_len(&self) -> usize {
        match self {
            ServerMessage::Join { .. } => JOIN_LEN,
            ServerMessage::Delta(entries) => 1 + DELTA_ENTRY_LEN * entries.len(),
            ServerMessage::Welcome { peers, .. } => 3 + PEER_ENTRY_LEN * welcome_count(peers),
            ServerMessage::FullSync(peers) => 1 + PEER_ENTRY_LEN * peers.len(),
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        match self {
            ServerMessage::Join { id, position } => {
                buf.put_u8(MSG_JOIN);
                put_peer(&mut buf, &PeerSnapshot::new(*id, *position));
            }
            ServerMessage::Delta(entries) => {
                buf.put_u8(MSG_DELTA);
                for entry in entries {
                    buf.put_u8(entry.id.0);
                    buf.put_i16_le(entry.dx);
                    buf.put_i16_le(entry.dy);
                }
            }
            ServerMessage::Welcome { assigned_id, peers } => {
                let count = welcome_count(peers);
                buf.put_u8(MSG_WELCOME);
                buf.put_u8(assigned_id.0);
                // count <= u8::MAX by construction
                buf.put_u8(count as u8);
                for peer in peers.iter().take(count) {
                    put_peer(&mut buf, peer);
                }
            }
            ServerMessage::FullSync(peers) => {
                buf.put_u8(MSG_FULL_SYNC);
                for peer in peers {
                    put_peer(&mut buf, peer);
                }
            }
        }
        buf.freeze()
    }

    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        let Some((&kind, mut body)) = frame.split_first() else {
            return Err(DecodeError::Empty);
        };

        match kind {
            MSG_JOIN => {
                if frame.len() != JOIN_LEN {
                    return Err(DecodeError::WrongLength {
                        expected: JOIN_LEN,
                        actual: frame.len(),
                    });
                }
                let peer = get_peer(&mut body);
                Ok(ServerMessage::Join {
                    id: peer.id,
                    position: peer.position,
                })
            }
            MSG_DELTA => {
                check_whole_entries(body, DELTA_ENTRY_LEN)?;
                let mut entries = Vec::with_capacity(body.len() / DELTA_ENTRY_LEN);
                while body.has_remaining() {
                    let id = PeerId(body.get_u8());
                    let dx = body.get_i16_le();
                    let dy = body.get_i16_le();
                    entries.push(DeltaEntry::new(id, dx, dy));
                }
                Ok(ServerMessage::Delta(entries))
            }
            MSG_WELCOME => {
                ensure_remaining(body, 2)?;
                let assigned_id = PeerId(body.get_u8());
                let count = usize::from(body.get_u8());
                let needed = count * PEER_ENTRY_LEN;
                ensure_remaining(body, needed)?;
                if body.len() > needed {
                    return Err(DecodeError::TrailingBytes(body.len() - needed));
                }
                let peers = (0..count).map(|_| get_peer(&mut body)).collect();
                Ok(ServerMessage::Welcome { assigned_id, peers })
            }
            MSG_FULL_SYNC => {
                check_whole_entries(body, PEER_ENTRY_LEN)?;
                let mut peers = Vec::with_capacity(body.len() / PEER_ENTRY_LEN);
                while body.has_remaining() {
                    peers.push(get_peer(&mut body));
                }
                Ok(ServerMessage::FullSync(peers))
            }
            other => Err(DecodeError::UnknownType(other)),
        }
    }
}

fn welcome_count(peers: &[PeerSnapshot]) -> usize {
    peers.len().min(usize::from(u8::MAX))
}

fn put_peer(buf: &mut BytesMut, peer: &PeerSnapshot) {
    buf.put_u8(peer.id.0);
    buf.put_i32_le(peer.position.x);
    buf.put_i32_le(peer.position.y);
}

// Callers check the remaining length first.
fn get_peer(buf: &mut &[u8]) -> PeerSnapshot {
    let id = PeerId(buf.get_u8());
    let x = buf.get_i32_le();
    let y = buf.get_i32_le();
    PeerSnapshot::new(id, Position::new(x, y))
}

fn ensure_remaining(buf: &[u8], needed: usize) -> Result<(), DecodeError> {
    if buf.len() < needed {
        return Err(DecodeError::Truncated {
            needed,
            available: buf.len(),
        });
    }
    Ok(())
}

fn check_whole_entries(body: &[u8], entry_len: usize) -> Result<(), DecodeError> {
    let partial = body.len() % entry_len;
    if partial != 0 {
        return Err(DecodeError::Truncated {
            needed: body.len() - partial + entry_len,
            available: body.len(),
        });
    }
    Ok(())
}
