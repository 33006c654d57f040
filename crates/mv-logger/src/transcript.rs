//! Per-session human-readable transcript (spec §4.7, §6 "Log files").
//!
//! Generalizes the teacher's `TranscriptWriter` (append-only
//! `<session_id>.jsonl`, `OpenOptions::append`, flush-per-write) from a
//! JSONL wire format to the plain-text, `=`-separated record format
//! spec §6 requires: `{session_id}.log` under the configured root.
//! Every write is best-effort — an I/O failure is logged and swallowed,
//! never propagated to the turn (spec §4.7).

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

const SEPARATOR: &str = "================================================================";

pub struct TranscriptWriter {
    base_dir: PathBuf,
}

impl TranscriptWriter {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
        }
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.base_dir.join(format!("{session_id}.log"))
    }

    fn append(&self, session_id: &str, block: String) {
        if let Err(e) = std::fs::create_dir_all(&self.base_dir) {
            tracing::warn!(session_id, error = %e, "failed to create transcript directory");
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
            tracing::warn!(session_id, error = %e, "failed to write transcript record");
        }
    }

    pub fn session_header(&self, session_id: &str, user_id: &str, initial_query: &str, started_at: DateTime<Utc>, source: &str) {
        let block = format!(
            "SESSION {session_id}\nuser: {user_id}\nsource: {source}\nstarted_at: {}\ninitial_query: {initial_query}\n",
            started_at.to_rfc3339()
        );
        self.append(session_id, block);
    }

    pub fn user_query(&self, session_id: &str, text: &str, at: DateTime<Utc>, source: &str) {
        let block = format!("QUERY [{}] ({source})\n{text}\n", at.to_rfc3339());
        self.append(session_id, block);
    }

    pub fn llm_call(&self, session_id: &str, model: &str, stage: &str, prompt: &str, response: &str, duration_ms: u64, status: &str) {
        let block = format!(
            "LLM_CALL model={model} stage={stage} duration_ms={duration_ms} status={status}\n--- prompt ---\n{prompt}\n--- response ---\n{response}\n"
        );
        self.append(session_id, block);
    }

    pub fn tool_call(&self, session_id: &str, tool_id: &str, input: &serde_json::Value, output: Option<&serde_json::Value>, duration_ms: u64, status: &str, truncate_bytes: usize) {
        let input_str = truncate(&input.to_string(), truncate_bytes);
        let output_str = output.map(|o| truncate(&o.to_string(), truncate_bytes)).unwrap_or_else(|| "<none>".into());
        let block = format!(
            "TOOL_CALL tool_id={tool_id} duration_ms={duration_ms} status={status}\n--- input ---\n{input_str}\n--- output ---\n{output_str}\n"
        );
        self.append(session_id, block);
    }

    pub fn agent_response(&self, session_id: &str, text: &str, sentiment: &str, insights: &[String], processing_time_ms: u64) {
        let block = format!(
            "RESPONSE sentiment={sentiment} processing_time_ms={processing_time_ms}\n{text}\ninsights: {}\n",
            insights.join("; ")
        );
        self.append(session_id, block);
    }

    pub fn session_footer(&self, session_id: &str, ended_at: DateTime<Utc>, duration_seconds: i64) {
        let block = format!("SESSION_END ended_at={} duration_seconds={duration_seconds}\n", ended_at.to_rfc3339());
        self.append(session_id, block);
    }
}

fn truncate(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut boundary = max_bytes;
    while boundary > 0 && !text.is_char_boundary(boundary) {
        boundary -= 1;
    }
    format!("{}...(truncated)", &text[..boundary])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_are_appended_with_separators() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TranscriptWriter::new(dir.path());
        writer.session_header("s1", "u1", "hello", Utc::now(), "web");
        writer.user_query("s1", "price of meta", Utc::now(), "web");

        let contents = std::fs::read_to_string(dir.path().join("s1.log")).unwrap();
        assert!(contents.contains("SESSION s1"));
        assert!(contents.contains("QUERY"));
        assert_eq!(contents.matches(SEPARATOR).count(), 2);
    }

    #[test]
    fn tool_output_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TranscriptWriter::new(dir.path());
        let big = serde_json::json!({ "data": "x".repeat(100) });
        writer.tool_call("s1", "price_lookup", &serde_json::json!({}), Some(&big), 10, "ok", 20);
        let contents = std::fs::read_to_string(dir.path().join("s1.log")).unwrap();
        assert!(contents.contains("...(truncated)"));
    }
}
