//! The WebSocket edge: the only network-facing crate in the workspace.
//! Wires `mv-sessions`/`mv-agent`/`mv-tools`/`mv-llm`/`mv-memory` into an
//! axum router and exposes the CLI (`serve`, `doctor`, `config`).

pub mod cli;
pub mod state;
pub mod transcribe;
pub mod ws;

use axum::routing::get;
use axum::Router;

pub use state::AppState;

/// Build the axum router: one WebSocket route, one liveness route.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/voice/ws", get(ws::voice_ws))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}
