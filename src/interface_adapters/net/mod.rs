// Network adapter modules split by peer sockets vs operator HTTP routes.

pub mod client;
pub mod internal;

pub use client::ws_handler;
pub use internal::{get_peer_handler, list_peers_handler};
