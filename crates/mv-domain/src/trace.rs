//! Structured trace events emitted across all MarketVoice crates.
//!
//! Mirrors the teacher's `TraceEvent` convention: one flat enum, serialized
//! to JSON and logged through `tracing` so a log pipeline can index on
//! `event` without parsing free-form messages.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionAdmitted {
        session_id: String,
        user_id: String,
        source: String,
    },
    SessionClosed {
        session_id: String,
        cause: String,
        duration_seconds: i64,
        persisted: bool,
    },
    TurnStarted {
        session_id: String,
        sequence: u64,
    },
    TurnCompleted {
        session_id: String,
        sequence: u64,
        processing_time_ms: u64,
        partial: bool,
    },
    ToolInvoked {
        tool_id: String,
        status: String,
        duration_ms: u64,
    },
    LlmCallStarted {
        stage: String,
        queue_depth: usize,
    },
    LlmCallCompleted {
        stage: String,
        duration_ms: u64,
        status: String,
    },
    MemoryFinalized {
        user_id: String,
        categories_updated: usize,
        skipped: bool,
    },
    BargeIn {
        session_id: String,
        discarded_chunks: usize,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "mv_event");
    }
}
