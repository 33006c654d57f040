use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool Registry (spec §4.5)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "d_timeout")]
    pub default_timeout_ms: u64,
    #[serde(default = "d_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub price: ToolTuning,
    #[serde(default)]
    pub news: ToolTuning,
    #[serde(default)]
    pub research: ToolTuning,
    #[serde(default)]
    pub preferences: ToolTuning,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: d_timeout(),
            max_retries: d_retries(),
            price: ToolTuning {
                cache_ttl_secs: 45,
                ..ToolTuning::default()
            },
            news: ToolTuning {
                cache_ttl_secs: 600,
                ..ToolTuning::default()
            },
            research: ToolTuning {
                cache_ttl_secs: 3600,
                ..ToolTuning::default()
            },
            preferences: ToolTuning {
                cache_ttl_secs: 60,
                ..ToolTuning::default()
            },
        }
    }
}

/// Per-tool cache TTL override; `0` means never cache (spec §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolTuning {
    #[serde(default)]
    pub cache_ttl_secs: u64,
}

impl Default for ToolTuning {
    fn default() -> Self {
        Self { cache_ttl_secs: 0 }
    }
}

fn d_timeout() -> u64 {
    5_000
}
fn d_retries() -> u32 {
    3
}
