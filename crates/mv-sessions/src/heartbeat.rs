//! Heartbeat monitor (spec §4.2): periodically scans for sessions whose
//! last heartbeat exceeds `IDLE_LIMIT` and reaps them. Scans at
//! `heartbeat_scan_interval_secs`, which must be `<= idle_limit_secs / 4`
//! so a session is never more than one scan late past its grace window
//! (spec §4.2 "Scan frequency"); a misconfigured interval is logged, not
//! rejected — the monitor still runs.
//!
//! Generalizes the teacher's `tokio::time::interval`-driven scan loops
//! (no lock held across an `await`: a snapshot of ids is taken, then
//! each reap is awaited independently).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::manager::SessionManager;

pub struct HeartbeatMonitor {
    manager: Arc<SessionManager>,
}

impl HeartbeatMonitor {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        let idle = manager.config().idle_limit_secs;
        let scan = manager.config().heartbeat_scan_interval_secs;
        if scan > idle / 4 {
            tracing::warn!(
                idle_limit_secs = idle,
                heartbeat_scan_interval_secs = scan,
                "heartbeat scan interval exceeds idle_limit/4; idle sessions may linger past their grace window"
            );
        }
        Self { manager }
    }

    /// Run the scan loop until `cancel` resolves. Intended to be spawned
    /// as a long-lived background task alongside the server.
    pub async fn run(&self, cancel: mv_domain::cancel::CancelToken) {
        let interval = Duration::from_secs(self.manager.config().heartbeat_scan_interval_secs.max(1));
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => self.reap_once().await,
            }
        }
    }

    async fn reap_once(&self) {
        let idle = self.manager.idle_sessions(Utc::now());
        for session_id in idle {
            tracing::info!(session_id = %session_id, "reaping idle session");
            self.manager.close(&session_id, "idle_timeout").await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mv_domain::config::{DeadlinesConfig, MemoryConfig, SessionsConfig, ToolsConfig};
    use mv_llm::{LlmGate, MockLlmClient};
    use mv_store::Store;
    use std::time::Duration as StdDuration;

    fn manager(dir: &std::path::Path, idle_limit_secs: u64) -> Arc<SessionManager> {
        let store = Arc::new(Store::in_memory());
        let llm_gate = Arc::new(LlmGate::new(
            Arc::new(MockLlmClient::new("test").with_latency(StdDuration::from_millis(1))),
            StdDuration::from_secs(5),
            8,
        ));
        let tools = Arc::new(mv_tools::registry::build_default(
            ToolsConfig::default(),
            Arc::new(mv_cache::KvCache::new()),
            store.clone(),
        ));
        let memory = Arc::new(mv_memory::MemoryManager::new(
            store.clone(),
            llm_gate.clone(),
            Arc::new(mv_logger::PostRunWriter::new(dir)),
            &DeadlinesConfig::default(),
            &MemoryConfig::default(),
        ));
        let agent = Arc::new(mv_agent::AgentGraph::new(llm_gate, tools, memory.clone(), DeadlinesConfig::default()));
        let transcripts = Arc::new(mv_logger::TranscriptWriter::new(dir));
        let mut config = SessionsConfig::default();
        config.idle_limit_secs = idle_limit_secs;
        config.heartbeat_scan_interval_secs = 1;
        Arc::new(SessionManager::new(store, agent, memory, transcripts, config))
    }

    #[tokio::test(start_paused = true)]
    async fn reaps_sessions_past_idle_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(dir.path(), 2);
        let session_id = mgr.admit("u1", "web").unwrap();

        let monitor = HeartbeatMonitor::new(mgr.clone());
        let cancel = mv_domain::cancel::CancelToken::new();
        let cancel2 = cancel.clone();
        let handle = tokio::spawn(async move { monitor.run(cancel2).await });

        tokio::time::advance(Duration::from_secs(5)).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(!mgr.is_active(&session_id));
        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn fresh_session_is_not_reaped() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(dir.path(), 120);
        let session_id = mgr.admit("u1", "web").unwrap();
        let idle = mgr.idle_sessions(Utc::now());
        assert!(idle.is_empty());
        assert!(mgr.is_active(&session_id));
    }
}
