//! Shared application state passed to all WebSocket/API handlers.
//! Mirrors the teacher's `AppState`: one `Clone`-able struct of `Arc`
//! services, built once at startup and handed to the axum router.

use std::sync::Arc;

use mv_domain::config::Config;
use mv_sessions::{HeartbeatMonitor, SessionManager};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionManager>,
    pub heartbeat: Arc<HeartbeatMonitor>,
}
