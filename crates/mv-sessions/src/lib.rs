//! Session lifecycle (spec §4.1/§4.2): admission, per-session turn
//! serialization, idle reaping, and close-path persistence, built on top
//! of the staged agent pipeline in `mv-agent`.

pub mod heartbeat;
pub mod manager;
pub mod state;

pub use heartbeat::HeartbeatMonitor;
pub use manager::SessionManager;
pub use state::SessionState;
