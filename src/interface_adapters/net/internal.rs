use crate::domain::{PeerId, PeerSnapshot};
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::state::AppState;

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

#[derive(Debug, serde::Serialize)]
pub struct PeerDto {
    id: u8,
    x: i32,
    y: i32,
}

impl From<PeerSnapshot> for PeerDto {
    fn from(peer: PeerSnapshot) -> Self {
        Self {
            id: peer.id.0,
            x: peer.position.x,
            y: peer.position.y,
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct PeersResponse {
    // Registered peers ordered by id.
    peers: Vec<PeerDto>,
}

pub async fn list_peers_handler(State(state): State<Arc<AppState>>) -> Json<PeersResponse> {
    let peers = state.sync.snapshot().into_iter().map(PeerDto::from).collect();
    Json(PeersResponse { peers })
}

pub async fn get_peer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u8>,
) -> impl IntoResponse {
    let id = PeerId(id);
    match state.sync.position(id) {
        Some(position) => Json(PeerDto::from(PeerSnapshot::new(id, position))).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("peer not found")),
        )
            .into_response(),
    }
}
