//! Post-run memory-finalization log (spec §4.6, §4.7, §6): a second
//! file per session recording the Memory Manager's finalize attempt —
//! prior notes, new notes, diff, LLM status, or an explicit skip
//! reason.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use mv_domain::entities::KeyNotes;

const SEPARATOR: &str = "================================================================";

pub struct PostRunWriter {
    base_dir: PathBuf,
}

impl PostRunWriter {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
        }
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.base_dir.join(format!("{session_id}_post-run.log"))
    }

    fn append(&self, session_id: &str, block: String) {
        if let Err(e) = std::fs::create_dir_all(&self.base_dir) {
            tracing::warn!(session_id, error = %e, "failed to create post-run log directory");
            return;
        }
        let path = self.path_for(session_id);
        let result = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| {
                file.write_all(block.as_bytes())?;
                file.write_all(SEPARATOR.as_bytes())?;
                file.write_all(b"\n")?;
                file.flush()
            });
        if let Err(e) = result {
            tracing::warn!(session_id, error = %e, "failed to write post-run record");
        }
    }

    /// Record a completed finalization: prior notes, merged notes, and
    /// the categories the diff touched.
    pub fn record_finalized(&self, session_id: &str, user_id: &str, prior: &KeyNotes, merged: &KeyNotes) {
        let diff: Vec<String> = merged
            .notes
            .keys()
            .filter(|category| prior.notes.get(category) != merged.notes.get(category))
            .map(|c| format!("{c:?}"))
            .collect();
        let block = format!(
            "FINALIZED user={user_id} at={}\nprior_categories={}\nnew_categories={}\nchanged={}\n",
            Utc::now().to_rfc3339(),
            prior.notes.len(),
            merged.notes.len(),
            diff.join(", "),
        );
        self.append(session_id, block);
    }

    /// Record a skipped finalization (empty buffer, LLM failure, or
    /// deadline exceeded) — spec §4.6 requires the skip itself to be
    /// logged, not just silently dropped.
    pub fn record_skipped(&self, session_id: &str, user_id: &str, reason: &str) {
        let block = format!("SKIPPED user={user_id} at={} reason={reason}\n", Utc::now().to_rfc3339());
        self.append(session_id, block);
    }
}
