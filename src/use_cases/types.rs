// Use-case level inputs/outputs for sessions and the broadcast loop.

use crate::domain::PeerId;
use bytes::Bytes;
use std::time::Duration;
use tokio::sync::mpsc;

/// Outbound queue of one peer. The session drains it into the socket.
pub type Outbound = mpsc::Sender<Bytes>;

/// Runtime knobs handed down from the framework layer.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Period of the broadcast loop.
    pub tick_interval: Duration,
    /// How often every peer gets absolute positions.
    pub full_sync_interval: Duration,
    /// Messages buffered per peer before fan-out starts dropping for it.
    pub outbound_capacity: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(30),
            full_sync_interval: Duration::from_secs(2),
            outbound_capacity: 64,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JoinError {
    #[error("peer id space exhausted")]
    IdsExhausted,
    #[error("outbound channel closed before welcome")]
    ChannelClosed,
}

/// How a connection ended. Both kinds run the same cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseKind {
    Graceful,
    Abrupt,
}

impl CloseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseKind::Graceful => "graceful",
            CloseKind::Abrupt => "abrupt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    // Queue full: this message is dropped for this peer only.
    Lagged,
    // Session already gone; its own handler deregisters it.
    Closed,
}

/// Per-peer results of one fan-out pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FanOutReport {
    pub delivered: usize,
    pub lagged: Vec<PeerId>,
    pub closed: Vec<PeerId>,
}

impl FanOutReport {
    pub fn record(&mut self, id: PeerId, outcome: SendOutcome) {
        match outcome {
            SendOutcome::Delivered => self.delivered += 1,
            SendOutcome::Lagged => self.lagged.push(id),
            SendOutcome::Closed => self.closed.push(id),
        }
    }

    pub fn attempted(&self) -> usize {
        self.delivered + self.lagged.len() + self.closed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.lagged.is_empty() && self.closed.is_empty()
    }
}
