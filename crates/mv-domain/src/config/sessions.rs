use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sessions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Heartbeat grace window (spec §4.1 "IDLE_LIMIT", default 2 minutes).
    #[serde(default = "d_idle_limit")]
    pub idle_limit_secs: u64,
    /// Heartbeat monitor scan frequency — must be `<= idle_limit_secs / 4`
    /// (spec §4.2).
    #[serde(default = "d_scan_interval")]
    pub heartbeat_scan_interval_secs: u64,
    /// Whether admission requires a pre-registered user (spec §4.1 `admit`:
    /// "Fails with UserUnknown if no such user and the deployment requires
    /// authenticated users").
    #[serde(default)]
    pub require_known_users: bool,
    /// Minimum retry attempts for close-path database writes (spec §4.1
    /// "retried with bounded exponential backoff (>=3 attempts)").
    #[serde(default = "d_close_retries")]
    pub close_retry_attempts: u32,
    /// Deadline for `close_all` during shutdown.
    #[serde(default = "d_shutdown_deadline")]
    pub shutdown_deadline_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            idle_limit_secs: d_idle_limit(),
            heartbeat_scan_interval_secs: d_scan_interval(),
            require_known_users: false,
            close_retry_attempts: d_close_retries(),
            shutdown_deadline_secs: d_shutdown_deadline(),
        }
    }
}

fn d_idle_limit() -> u64 {
    120
}
fn d_scan_interval() -> u64 {
    30
}
fn d_close_retries() -> u32 {
    3
}
fn d_shutdown_deadline() -> u64 {
    30
}
