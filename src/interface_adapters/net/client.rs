use crate::interface_adapters::state::AppState;
use crate::use_cases::{CloseKind, PeerSession, SyncState};

use axum::{
    extract::{
        ConnectInfo, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use futures::{SinkExt, StreamExt, stream::SplitSink};
use std::{
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, info, info_span, warn};

#[derive(Debug, thiserror::Error)]
enum NetError {
    #[error("websocket error: {0}")]
    Ws(#[from] axum::Error),
}

enum LoopControl {
    Continue,
    Close(CloseKind),
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);

struct ConnStats {
    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,
    malformed: u64,
    last_malformed_log: Option<Instant>,
}

impl ConnStats {
    fn new() -> Self {
        Self {
            msgs_in: 0,
            msgs_out: 0,
            bytes_in: 0,
            bytes_out: 0,
            malformed: 0,
            last_malformed_log: None,
        }
    }

    fn record_in(&mut self, len: usize) {
        self.msgs_in += 1;
        self.bytes_in += len as u64;
    }

    fn record_out(&mut self, len: usize) {
        self.msgs_out += 1;
        self.bytes_out += len as u64;
    }

    // Counts a discarded frame and says whether to log it.
    fn record_malformed(&mut self) -> bool {
        self.malformed += 1;
        should_log(&mut self.last_malformed_log)
    }
}

fn should_log(last: &mut Option<Instant>) -> bool {
    match last {
        Some(at) if at.elapsed() < LOG_THROTTLE => false,
        _ => {
            *last = Some(Instant::now());
            true
        }
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let sync = state.sync.clone();
    let capacity = state.outbound_capacity;
    ws.on_upgrade(move |socket| {
        let span = info_span!("conn", %remote, peer_id = tracing::field::Empty);
        handle_socket(socket, sync, capacity).instrument(span)
    })
}

async fn handle_socket(mut socket: WebSocket, sync: Arc<SyncState>, capacity: usize) {
    let (outbound_tx, outbound_rx) = mpsc::channel::<Bytes>(capacity.max(1));

    let session = match PeerSession::open(sync, outbound_tx) {
        Ok(session) => session,
        Err(e) => {
            warn!(error = %e, "refusing connection");
            if let Err(err) =
                send_close_with_reason(&mut socket, close_code::POLICY, "no peer ids left").await
            {
                debug!(error = %err, "failed to send close frame");
            }
            return;
        }
    };

    tracing::Span::current().record("peer_id", session.id().0);
    info!(welcomed = session.welcomed_peers(), "peer connected");

    let mut stats = ConnStats::new();
    let kind = run_client_loop(socket, outbound_rx, &session, &mut stats).await;
    disconnect_cleanup(session, kind, &stats);
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await?;
    Ok(())
}

// Pumps inbound frames into the store and the peer's outbound queue into its socket
// until the connection ends.
async fn run_client_loop(
    socket: WebSocket,
    mut outbound_rx: mpsc::Receiver<Bytes>,
    session: &PeerSession,
    stats: &mut ConnStats,
) -> CloseKind {
    let (mut sink, mut stream) = socket.split();

    let kind = loop {
        let control = tokio::select! {
            incoming = stream.next() => handle_incoming_ws(incoming, session, stats),

            outbound = outbound_rx.recv() => match outbound {
                Some(bytes) => forward_outbound(&mut sink, bytes, stats).await,
                // The registry dropped our queue; nothing more will arrive.
                None => LoopControl::Close(CloseKind::Abrupt),
            },
        };

        if let LoopControl::Close(kind) = control {
            break kind;
        }
    };

    if let Err(err) = sink.close().await {
        debug!(error = %err, "socket close error");
    }
    kind
}

fn handle_incoming_ws(
    incoming: Option<Result<Message, axum::Error>>,
    session: &PeerSession,
    stats: &mut ConnStats,
) -> LoopControl {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Binary(frame) => {
                stats.record_in(frame.len());
                if let Err(e) = session.apply_frame(&frame) {
                    if stats.record_malformed() {
                        warn!(
                            bytes = frame.len(),
                            error = %e,
                            discarded = stats.malformed,
                            "discarding malformed frame"
                        );
                    }
                }
                LoopControl::Continue
            }
            Message::Text(text) => {
                stats.record_in(text.len());
                if stats.record_malformed() {
                    warn!(
                        bytes = text.len(),
                        discarded = stats.malformed,
                        "discarding text frame"
                    );
                }
                LoopControl::Continue
            }
            Message::Ping(_) | Message::Pong(_) => LoopControl::Continue,
            Message::Close(frame) => {
                debug!(code = ?frame.as_ref().map(|f| f.code), "close frame received");
                LoopControl::Close(CloseKind::Graceful)
            }
        },
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            LoopControl::Close(CloseKind::Abrupt)
        }
        None => {
            debug!("websocket ended without close frame");
            LoopControl::Close(CloseKind::Abrupt)
        }
    }
}

async fn forward_outbound(
    sink: &mut SplitSink<WebSocket, Message>,
    bytes: Bytes,
    stats: &mut ConnStats,
) -> LoopControl {
    let len = bytes.len();
    match sink.send(Message::Binary(bytes)).await.map_err(NetError::from) {
        Ok(()) => {
            stats.record_out(len);
            LoopControl::Continue
        }
        Err(err) => {
            // Our own socket is gone; treat it like an abrupt close.
            warn!(error = %err, "failed to send to peer");
            LoopControl::Close(CloseKind::Abrupt)
        }
    }
}

fn disconnect_cleanup(session: PeerSession, kind: CloseKind, stats: &ConnStats) {
    debug!(
        peer_id = session.id().0,
        msgs_in = stats.msgs_in,
        msgs_out = stats.msgs_out,
        bytes_in = stats.bytes_in,
        bytes_out = stats.bytes_out,
        malformed = stats.malformed,
        "connection stats"
    );
    session.close(kind);
}
