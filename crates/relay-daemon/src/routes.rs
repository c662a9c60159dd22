//! Axum router and all HTTP handlers for the relay daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. All handlers are `pub(crate)` so tests can compose the
//! router directly.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

use crate::state::{uptime_secs, AppState, BusMsg, RunSummary};

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/status", get(status_handler))
        .route("/v1/sources", get(list_sources))
        .route("/v1/run", post(run_once))
        .route("/v1/stream", get(stream))
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
    version: &'static str,
}

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let db_ok = relay_db::status(&st.pool).await.map(|s| s.ok).unwrap_or(false);
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: db_ok,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let mut snap = st.status.read().await.clone();
    snap.daemon_uptime_secs = uptime_secs();
    (StatusCode::OK, Json(snap))
}

#[derive(Serialize)]
struct SourceSummary {
    id: String,
    platform: String,
    enabled: bool,
    priority_interval_minutes: i64,
    last_check: Option<chrono::DateTime<chrono::Utc>>,
    error_count: i32,
    disabled_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// `GET /v1/sources` — every registered source's configuration joined with
/// its durable `source_state` row, for an operator dashboard.
pub(crate) async fn list_sources(State(st): State<Arc<AppState>>) -> Response {
    let mut out = Vec::with_capacity(st.handles.len());
    for handle in &st.handles {
        let row = match st.store.source_state.get(&handle.config.id).await {
            Ok(row) => row,
            Err(err) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": err.to_string() })),
                )
                    .into_response();
            }
        };
        out.push(SourceSummary {
            id: handle.config.id.clone(),
            platform: handle.config.platform.clone(),
            enabled: handle.config.enabled,
            priority_interval_minutes: handle.config.effective_interval_minutes(),
            last_check: row.as_ref().and_then(|r| r.last_check),
            error_count: row.as_ref().map(|r| r.error_count).unwrap_or(0),
            disabled_at: row.as_ref().and_then(|r| r.disabled_at),
        });
    }
    (StatusCode::OK, Json(out)).into_response()
}

/// `POST /v1/run` — triggers one orchestrator pass synchronously and
/// returns its summary; also broadcasts a `run_completed` SSE event.
pub(crate) async fn run_once(State(st): State<Arc<AppState>>) -> Response {
    {
        let mut s = st.status.write().await;
        s.state = "running".to_string();
    }

    let report = match st.orchestrator().run_once().await {
        Ok(report) => report,
        Err(err) => {
            let mut s = st.status.write().await;
            s.state = "idle".to_string();
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": err.to_string() })),
            )
                .into_response();
        }
    };

    let summary = RunSummary {
        exit_code: report.exit_code,
        sources_run: report.results.len(),
        sources_errored: report.results.iter().filter(|r| r.is_hard_error()).count(),
    };

    {
        let mut s = st.status.write().await;
        s.state = "idle".to_string();
        s.last_run = Some(summary.clone());
    }

    info!(exit_code = summary.exit_code, sources_run = summary.sources_run, "run/once");
    let _ = st.bus.send(BusMsg::RunCompleted(summary.clone()));

    (StatusCode::OK, Json(summary)).into_response()
}

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(rx: broadcast::Receiver<BusMsg>) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let event_name = match &m {
                    BusMsg::Heartbeat { .. } => "heartbeat",
                    BusMsg::RunCompleted(_) => "run_completed",
                    BusMsg::LogLine { .. } => "log",
                };
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(event_name).data(data)))
            }
            Err(_) => None,
        }
    })
}
