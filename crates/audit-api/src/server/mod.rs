use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Request, State};
use axum::http::header::{HeaderName, HeaderValue};
use axum::http::Method;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use audit_core::EngineError;
use contracts::{
    ActionRequest, ActionResult, ApiError, ErrorCode, GameConfig, GameEvent, HistoryEntry,
    LeaderboardEntry, Phase, RoundView, ScenarioView, SCHEMA_VERSION_V1,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::{GameApi, PersistenceError};

const MAX_TICK_STEPS: u64 = 10_000;

include!("error.rs");
include!("state.rs");
include!("routes/session.rs");
include!("routes/catalog.rs");
include!("routes/stream.rs");
include!("util.rs");

#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub addr: SocketAddr,
    pub config: GameConfig,
    /// Identity store location; `None` keeps everything in memory.
    pub sqlite_path: Option<PathBuf>,
    pub player_name: String,
    /// Skip the background ticker; the clock only moves through `POST /api/v1/tick`.
    pub paused: bool,
}

pub async fn serve(options: ServeOptions) -> Result<(), ServerError> {
    let tick_interval = Duration::from_millis(options.config.tick_interval_ms.max(1));
    let api = match &options.sqlite_path {
        Some(path) => GameApi::open_sqlite(options.config, path, &options.player_name)?,
        None => GameApi::in_memory(options.config, &options.player_name)?,
    };
    let state = AppState::new(api);
    if !options.paused {
        spawn_ticker(state.clone(), tick_interval);
    }
    let app = router(state);

    let listener = TcpListener::bind(options.addr).await?;
    info!(addr = %options.addr, paused = options.paused, "chain audit server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/session", get(get_session))
        .route("/api/v1/actions", post(submit_action).get(get_action_audit))
        .route("/api/v1/tick", post(tick_clock))
        .route("/api/v1/history", get(get_history))
        .route("/api/v1/leaderboard", get(get_leaderboard))
        .route("/api/v1/scenarios", get(get_scenarios))
        .route("/api/v1/stream", get(stream_session))
        .layer(middleware::from_fn(cors_middleware))
        .with_state(state)
}

/// Advances the clock once per `period` while a round is in progress.
fn spawn_ticker(state: AppState, period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let messages = {
                let mut inner = state.inner.lock().await;
                if matches!(inner.api.phase(), Phase::Lobby | Phase::Results) {
                    continue;
                }
                inner.api.tick(1);
                collect_delta_messages(&mut inner)
            };
            broadcast_messages(&state, messages);
        }
    })
}

async fn cors_middleware(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = Response::new(axum::body::Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut());
    response
}

#[cfg(test)]
mod tests;
