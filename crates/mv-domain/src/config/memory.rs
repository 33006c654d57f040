use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Memory Manager (spec §4.6)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Minimum tracked-turn buffer size before a finalize is worth an LLM
    /// call — always 1 per spec §4.6 ("if the buffer has at least one
    /// entry"); kept configurable for tests that want to assert the
    /// skip-on-empty path explicitly.
    #[serde(default = "d_min_buffer")]
    pub min_buffer_for_finalize: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            min_buffer_for_finalize: d_min_buffer(),
        }
    }
}

fn d_min_buffer() -> usize {
    1
}
