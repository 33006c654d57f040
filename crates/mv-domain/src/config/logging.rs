use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session Logger (spec §4.7)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Root directory for per-session transcript and post-run files.
    #[serde(default = "d_log_root")]
    pub transcript_root: PathBuf,
    /// Tool output truncation cap in bytes (spec §4.7 default 8 KB).
    #[serde(default = "d_truncate_bytes")]
    pub truncate_bytes: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            transcript_root: d_log_root(),
            truncate_bytes: d_truncate_bytes(),
        }
    }
}

fn d_log_root() -> PathBuf {
    PathBuf::from("./data/transcripts")
}
fn d_truncate_bytes() -> usize {
    8 * 1024
}
