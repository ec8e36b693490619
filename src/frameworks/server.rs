// Framework bootstrap for the position sync server runtime.

use crate::frameworks::config;
use crate::interface_adapters::net::{get_peer_handler, list_peers_handler, ws_handler};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{SyncSettings, SyncState, broadcast_task};

use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .route("/peers", get(list_peers_handler))
        .route("/peers/{id}", get(get_peer_handler))
        .with_state(state)
}

pub async fn run(listener: tokio::net::TcpListener, settings: SyncSettings) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state(&settings);

    // One broadcast loop per process, for as long as the server runs.
    tokio::spawn(broadcast_task(state.sync.clone(), settings));

    tracing::info!(%address, "listening");

    // Peer sockets log their remote address.
    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([0, 0, 0, 0], config::http_port()));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener, config::sync_settings()).await
}

fn build_state(settings: &SyncSettings) -> Arc<AppState> {
    tracing::debug!(
        tick_ms = settings.tick_interval.as_millis() as u64,
        full_sync_ms = settings.full_sync_interval.as_millis() as u64,
        outbound_capacity = settings.outbound_capacity,
        "sync settings"
    );

    Arc::new(AppState {
        sync: Arc::new(SyncState::new()),
        outbound_capacity: settings.outbound_capacity,
    })
}
