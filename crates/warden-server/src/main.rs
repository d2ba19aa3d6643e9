mod config;
mod version;

use std::net::SocketAddr;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use warden_core::ConcurrencyGate;
use warden_dispatch::{DispatchConfig, Dispatcher, DispatcherParts, ReplySink, connection};
use warden_store::{AfkStore, CooldownStore, GiveawayStore, LevelStore, WarningStore};
use warden_upstream::{StatusAggregator, UpstreamClient};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warden=debug,tower_http=debug".into()),
        )
        .init();

    // Config — the only place the environment is read.
    let config = Config::from_env()?;
    std::fs::create_dir_all(&config.data_dir)?;

    let running_version = version::bump(&config.data_dir.join("version.json"));
    info!("warden v{} starting", running_version);

    // Stores: constructed here, injected into the dispatcher. Each owns
    // its snapshot file exclusively.
    let levels = LevelStore::load(config.data_dir.join("levels.json"));
    let warnings = WarningStore::load(config.data_dir.join("warnings.json"));
    let giveaways = GiveawayStore::load(config.data_dir.join("giveaways.json"));

    // One gate for every outbound call the process makes.
    let gate = ConcurrencyGate::new(config.gate_limit);
    let upstream = UpstreamClient::new(gate, config.upstream.clone());
    let status = StatusAggregator::new(upstream.clone(), config.status_services.clone());

    let dispatcher = Dispatcher::new(DispatcherParts {
        sink: ReplySink::new(),
        cooldowns: CooldownStore::new(),
        afk: AfkStore::new(),
        levels,
        warnings,
        giveaways,
        upstream,
        status,
        config: DispatchConfig {
            xp_per_message: config.xp_per_message,
            xp_cooldown: config.xp_cooldown,
            reload_cooldown: config.reload_cooldown,
        },
    });

    // Conclusion timers died with the last process; re-derive them from
    // the persisted records before accepting events.
    dispatcher.restore_scheduled();

    let app = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(dispatcher)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("warden gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(
    State(dispatcher): State<Dispatcher>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher))
}
