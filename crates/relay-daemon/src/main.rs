//! relay-daemon entry point.
//!
//! This file is intentionally thin: it loads config, connects the database,
//! builds the shared state, wires middleware, and starts the HTTP server.
//! All route handlers live in `routes.rs`; all shared state types live in
//! `state.rs`; source/publisher wiring lives in `wiring.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use relay_daemon::{routes, state, wiring};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience); silent if absent —
    // production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let config_paths = config_paths_from_env()?;
    let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
    let loaded = relay_config::load_layered_yaml(&path_refs).context("load daemon config")?;

    let unused = relay_config::consumption::report_unused_keys(
        &loaded.config_json,
        relay_config::consumption::consumed_pointers(relay_config::consumption::RunMode::Daemon),
    );
    for key in unused {
        tracing::warn!(key, "config key is not consumed by this run mode");
    }

    let pool = relay_db::connect_from_env().await?;
    relay_db::migrate(&pool).await?;

    let dry_run = wiring::dry_run_from_env();
    let fixture_dir = wiring::fixture_dir_from_env();
    let handles = wiring::build_handles(&loaded, dry_run, fixture_dir.as_deref())?;

    let shared = Arc::new(state::AppState::new(pool, loaded.config.global.clone(), handles));

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(30));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = bind_addr_from_env().unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8899)));
    info!("relay-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// `RELAY_CONFIG_PATHS` is a comma-separated list of layered YAML config
/// files, merged in order (base -> env -> local overrides).
fn config_paths_from_env() -> anyhow::Result<Vec<String>> {
    let raw = std::env::var("RELAY_CONFIG_PATHS")
        .context("missing env var RELAY_CONFIG_PATHS (comma-separated layered config paths)")?;
    Ok(raw.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("RELAY_DAEMON_ADDR").ok()?.parse().ok()
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins.iter().filter_map(|o| HeaderValue::from_str(o).ok()).collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
