use anyhow::Context;
use clap::Parser;
use pineapple_server::auth::AuthGate;
use pineapple_server::config::Config;
use pineapple_server::persistence::Store;
use pineapple_server::registry::RoomRegistry;
use pineapple_server::server::{self, AppState};
use pineapple_server::session::SessionHub;
use pineapple_server::user_store::InMemoryUserStore;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.log_level))
        .init();

    let store = Arc::new(Store::new(&config.storage_root));
    let snapshot = store.load().await;
    let registry = Arc::new(RoomRegistry::new());
    for room in &snapshot.rooms {
        // Restored rooms start empty of players; clients re-join over the
        // socket and are re-seated from their own client-side state.
        let _ = registry
            .create_room(
                room.id.clone(),
                room.name.clone(),
                room.owner.clone(),
                50,
                100,
                1_000,
                50_000,
                config.turn_seconds,
            )
            .await;
    }
    info!(rooms = snapshot.rooms.len(), "restored registry snapshot");

    let hub = Arc::new(SessionHub::new());
    let (expiry_tx, expiry_rx) = tokio::sync::mpsc::channel(64);
    registry.spawn_reaper(
        config.idle_limit_minutes,
        config.expiry_warning_minutes,
        std::time::Duration::from_secs(config.cleanup_interval_secs),
        expiry_tx,
    );
    registry.spawn_snapshotter(store, std::time::Duration::from_secs(config.save_interval_secs));
    tokio::spawn(server::run_expiry_notifier(expiry_rx, hub.clone()));

    let state = Arc::new(AppState {
        registry,
        hub,
        auth: AuthGate::new(&config.jwt_secret),
        user_store: Arc::new(InMemoryUserStore::new()),
        config: config.clone(),
    });

    let app = server::router(state);

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on {addr}");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .context("axum server error")?;

    Ok(())
}
