// Domain layer: peer identity, positions and delta rules.

pub mod delta;
pub mod ids;
pub mod positions;
pub mod state;

pub use delta::{DeltaBatch, DeltaEntry, DeltaTracker};
pub use ids::IdAllocator;
pub use positions::PositionStore;
pub use state::{PeerId, PeerSnapshot, Position};
