// Per-connection peer lifecycle, independent of the transport.

use super::state::SyncState;
use super::types::{CloseKind, JoinError, Outbound};
use crate::domain::{PeerId, Position};
use crate::interface_adapters::protocol::{ClientUpdate, DecodeError};
use std::sync::Arc;
use tracing::{debug, info};

/// An active peer. Dropping it deregisters the peer, so every exit path cleans up.
pub struct PeerSession {
    id: PeerId,
    welcomed: usize,
    state: Arc<SyncState>,
    released: bool,
}

impl PeerSession {
    /// Connecting -> Active: register, queue the welcome, announce the join.
    pub fn open(state: Arc<SyncState>, outbound: Outbound) -> Result<Self, JoinError> {
        let admission = state.admit(outbound)?;
        let id = admission.id;

        let report = &admission.announced;
        if !report.is_clean() {
            debug!(
                peer_id = id.0,
                lagged = report.lagged.len(),
                closed = report.closed.len(),
                "join announcement not delivered everywhere"
            );
        }

        Ok(Self {
            id,
            welcomed: admission.others.len(),
            state,
            released: false,
        })
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    /// Number of peers listed in this peer's welcome.
    pub fn welcomed_peers(&self) -> usize {
        self.welcomed
    }

    /// Applies one inbound frame. A bad frame leaves the store untouched.
    pub fn apply_frame(&self, frame: &[u8]) -> Result<Position, DecodeError> {
        let position = Position::from(ClientUpdate::decode(frame)?);
        self.state.update(self.id, position);
        Ok(position)
    }

    /// Active -> Closed.
    pub fn close(mut self, kind: CloseKind) {
        self.release();
        info!(peer_id = self.id.0, close = kind.as_str(), "peer disconnected");
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.state.deregister(self.id);
        }
    }
}

impl Drop for PeerSession {
    fn drop(&mut self) {
        self.release();
    }
}
