// Use cases layer: shared sync state, peer sessions and the broadcast loop.

pub mod broadcast;
pub mod session;
pub mod state;
pub mod types;

pub use broadcast::{BroadcastLoop, TickOutcome, broadcast_task};
pub use session::PeerSession;
pub use state::{Admission, SyncState};
pub use types::{CloseKind, FanOutReport, JoinError, Outbound, SendOutcome, SyncSettings};
