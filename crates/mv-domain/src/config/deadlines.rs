use serde::{Deserialize, Serialize};
use std::time::Duration;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Deadlines & timeouts (spec §5)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadlinesConfig {
    /// Bounds one full turn, end to end.
    #[serde(default = "d_turn")]
    pub turn_deadline_secs: u64,
    /// Bounds the parallel tool fan-out.
    #[serde(default = "d_turn_tool")]
    pub turn_tool_deadline_secs: u64,
    /// Bounds the checklist join.
    #[serde(default = "d_checklist_join")]
    pub checklist_join_deadline_secs: u64,
    /// Bounds a single LLM call.
    #[serde(default = "d_llm_timeout")]
    pub llm_timeout_secs: u64,
    /// Bounds memory finalization at session close.
    #[serde(default = "d_finalize")]
    pub finalize_deadline_secs: u64,
}

impl Default for DeadlinesConfig {
    fn default() -> Self {
        Self {
            turn_deadline_secs: d_turn(),
            turn_tool_deadline_secs: d_turn_tool(),
            checklist_join_deadline_secs: d_checklist_join(),
            llm_timeout_secs: d_llm_timeout(),
            finalize_deadline_secs: d_finalize(),
        }
    }
}

impl DeadlinesConfig {
    pub fn turn_deadline(&self) -> Duration {
        Duration::from_secs(self.turn_deadline_secs)
    }
    pub fn turn_tool_deadline(&self) -> Duration {
        Duration::from_secs(self.turn_tool_deadline_secs)
    }
    pub fn checklist_join_deadline(&self) -> Duration {
        Duration::from_secs(self.checklist_join_deadline_secs)
    }
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }
    pub fn finalize_deadline(&self) -> Duration {
        Duration::from_secs(self.finalize_deadline_secs)
    }
}

fn d_turn() -> u64 {
    120
}
fn d_turn_tool() -> u64 {
    90
}
fn d_checklist_join() -> u64 {
    120
}
fn d_llm_timeout() -> u64 {
    30
}
fn d_finalize() -> u64 {
    30
}
