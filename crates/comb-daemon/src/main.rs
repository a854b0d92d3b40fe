//! comb-daemon: the reward ledger service.
//!
//! Single OS process running a Tokio runtime. The tournament, achievement
//! and identity services talk to it via JSON-RPC over a Unix socket.

mod commands;
mod config;
mod events;
mod rpc;

use std::sync::Arc;

use comb_db::SqliteStore;
use comb_rewards::{RewardEngine, SystemClock};
use tracing::{error, info, warn};

use crate::config::DaemonConfig;
use crate::events::{EventBus, LedgerEvent};
use crate::rpc::RpcServer;

/// Daemon-wide shared state.
pub struct DaemonState {
    /// Reward engine over the SQLite ledger.
    pub engine: RewardEngine<SqliteStore>,
    /// Event bus for pushing ledger events to subscribers.
    pub event_bus: EventBus,
}

impl DaemonState {
    pub fn new(engine: RewardEngine<SqliteStore>, event_bus: EventBus) -> Self {
        Self { engine, event_bus }
    }

    /// Emit an event stamped with the engine's clock.
    pub fn emit(&self, kind: LedgerEvent, payload: serde_json::Value) {
        self.event_bus.emit(kind, self.engine.now(), payload);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = DaemonConfig::load()?;

    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("comb={}", config.logging.log_level).parse()?);
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(version = env!("CARGO_PKG_VERSION"), "comb-rewards daemon starting");

    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let store = if config.storage.ephemeral {
        warn!("ephemeral storage: the ledger will not survive a restart");
        SqliteStore::open_memory()?
    } else {
        let db_path = config.db_path();
        info!(path = ?db_path, "opening ledger");
        SqliteStore::open(&db_path)?
    };
    let engine = RewardEngine::new(store, Arc::new(SystemClock));
    let state = Arc::new(DaemonState::new(engine, EventBus::new(1024)));

    let socket_path = config.socket_path();
    let server = RpcServer::new(state.clone(), socket_path.clone());
    state.emit(
        LedgerEvent::DaemonStarted,
        serde_json::json!({ "version": env!("CARGO_PKG_VERSION") }),
    );

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!(error = %e, "RPC server stopped");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
        }
    }

    if let Err(e) = std::fs::remove_file(&socket_path) {
        warn!(path = ?socket_path, error = %e, "could not remove socket");
    }
    info!(events = state.event_bus.sequence(), "daemon stopped");
    Ok(())
}
