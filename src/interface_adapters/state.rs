use crate::use_cases::SyncState;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    // Position store and connection registry shared with the broadcast loop.
    pub sync: Arc<SyncState>,
    // Per-peer outbound queue length.
    pub outbound_capacity: usize,
}
