//! Shared runtime state for the relay daemon.
//!
//! All types here are `Clone`-able (via `Arc`). Handlers receive
//! `State<Arc<AppState>>` from Axum; this module owns nothing async itself
//! beyond the heartbeat task.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};

use relay_config::GlobalConfig;
use relay_db::Store;
use relay_runtime::{Orchestrator, SourceHandle};
use sqlx::PgPool;

/// Messages broadcast over the internal event bus and surfaced as SSE
/// events on `GET /v1/stream`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat { ts_millis: i64 },
    RunCompleted(RunSummary),
    LogLine { level: String, msg: String },
}

/// Static build metadata included in health / status responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

/// Summary of one orchestrator pass, reported by `POST /v1/run` and carried
/// in the `run_completed` SSE event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub exit_code: i32,
    pub sources_run: usize,
    pub sources_errored: usize,
}

/// Point-in-time daemon status, returned by `GET /v1/status`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub daemon_uptime_secs: u64,
    /// "idle" while no run is in flight, "running" while one is.
    pub state: String,
    pub last_run: Option<RunSummary>,
}

/// Cloneable (Arc) handle shared across all Axum handlers.
pub struct AppState {
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    pub status: RwLock<StatusSnapshot>,
    pub pool: PgPool,
    pub store: Store,
    pub global: GlobalConfig,
    pub handles: Vec<SourceHandle>,
}

impl AppState {
    pub fn new(pool: PgPool, global: GlobalConfig, handles: Vec<SourceHandle>) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);

        let initial_status = StatusSnapshot {
            daemon_uptime_secs: uptime_secs(),
            state: "idle".to_string(),
            last_run: None,
        };

        Self {
            bus,
            build: BuildInfo {
                service: "relay-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            status: RwLock::new(initial_status),
            store: Store::new(pool.clone()),
            pool,
            global,
            handles,
        }
    }

    /// Builds a fresh `Orchestrator` over this state's store/config/handles.
    /// Cheap: `Store` and `SourceHandle` are `Clone` wrappers around shared
    /// connection pools and `Arc` adapters.
    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(self.store.clone(), self.global.clone(), self.handles.clone())
    }
}

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START.get_or_init(std::time::Instant::now).elapsed().as_secs()
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}
