use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM Gate (spec §4.4)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Queue depth at which a warning is logged (purely observational —
    /// the gate never rejects callers for queue depth, per spec §4.4).
    #[serde(default = "d_queue_warn")]
    pub queue_depth_warning: usize,
    /// Model identifier passed to the mock/adapter (out of scope per
    /// spec §1, kept here so a real adapter can read it).
    #[serde(default = "d_model")]
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            queue_depth_warning: d_queue_warn(),
            model: d_model(),
        }
    }
}

fn d_queue_warn() -> usize {
    8
}
fn d_model() -> String {
    "mock-llm-1".into()
}
