//! Memory Manager (spec §4.6): per-user "key notes", one short prose
//! summary per category. Lifecycle is load → track → finalize, with the
//! LLM call gated through `mv_llm::LlmGate` and writes serialized per
//! user by the store's natural-ID upsert (spec §4.6 "Serialization").
//!
//! Generalizes the teacher's `serialmemory-client::UserFactsBuilder`
//! graceful-degradation style (never fail the caller; log and move on)
//! to a write path instead of a read-only context builder.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mv_domain::config::{DeadlinesConfig, MemoryConfig};
use mv_domain::entities::{Category, IntentTag, KeyNotes, UserId};
use mv_domain::json_tolerant::parse_tolerant;
use mv_llm::{LlmGate, LlmRequest};
use mv_logger::PostRunWriter;
use mv_store::{Store, StoreCredential};
use parking_lot::Mutex;

/// One turn appended to a session's tracked-turn buffer (spec §4.6
/// "Track").
#[derive(Debug, Clone, serde::Serialize)]
pub struct TrackedTurn {
    pub query: String,
    pub intent: IntentTag,
    pub symbols: Vec<String>,
    pub short_summary: String,
}

pub struct MemoryManager {
    store: Arc<Store>,
    llm_gate: Arc<LlmGate>,
    post_run: Arc<PostRunWriter>,
    finalize_deadline: Duration,
    min_buffer_for_finalize: usize,
    buffers: Mutex<HashMap<String, Vec<TrackedTurn>>>,
}

impl MemoryManager {
    pub fn new(
        store: Arc<Store>,
        llm_gate: Arc<LlmGate>,
        post_run: Arc<PostRunWriter>,
        deadlines: &DeadlinesConfig,
        memory: &MemoryConfig,
    ) -> Self {
        Self {
            store,
            llm_gate,
            post_run,
            finalize_deadline: deadlines.finalize_deadline(),
            min_buffer_for_finalize: memory.min_buffer_for_finalize,
            buffers: Mutex::new(HashMap::new()),
        }
    }

    /// Initialize a session's tracked-turn buffer on first use (spec
    /// §4.6 "Load"). Idempotent — calling twice for the same session is
    /// a no-op.
    pub fn load(&self, session_id: &str) {
        self.buffers.lock().entry(session_id.to_string()).or_default();
    }

    /// Append a turn to the session buffer, skipping intents that never
    /// contribute to memory (spec §9 open question (a): `chat` and
    /// `unknown` never do).
    pub fn track(&self, session_id: &str, turn: TrackedTurn) {
        if !turn.intent.contributes_to_memory() {
            return;
        }
        self.buffers.lock().entry(session_id.to_string()).or_default().push(turn);
    }

    /// Finalize a session's memory at close (spec §4.6 "Finalize").
    /// Bounded by `FINALIZE_DEADLINE`; on empty buffer, LLM failure, or
    /// timeout, skips the write and records why in the post-run log.
    pub async fn finalize(&self, session_id: &str, user_id: &UserId) {
        let buffer = self.buffers.lock().remove(session_id).unwrap_or_default();
        if buffer.len() < self.min_buffer_for_finalize {
            self.post_run.record_skipped(session_id, user_id, "empty buffer");
            return;
        }

        let result = tokio::time::timeout(self.finalize_deadline, self.run_finalize(session_id, user_id, &buffer)).await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => self.post_run.record_skipped(session_id, user_id, &reason),
            Err(_) => self.post_run.record_skipped(session_id, user_id, "finalize deadline exceeded"),
        }
    }

    async fn run_finalize(&self, session_id: &str, user_id: &UserId, buffer: &[TrackedTurn]) -> Result<(), String> {
        let prior = self.store.get_notes(user_id).unwrap_or_else(|| KeyNotes {
            user_id: user_id.clone(),
            notes: HashMap::new(),
            updated_at: None,
        });

        let buffer_json = serde_json::to_string(buffer).unwrap_or_default();
        let prior_json = serde_json::to_string(&prior.notes).unwrap_or_default();
        let system_prompt = "You maintain short per-category prose notes about a user's market interests. \
            Revise the existing notes given the new tracked turns. Respond with a JSON object mapping \
            category name to short prose summary, using only these categories: stocks, investment, \
            trading, research, watchlist, news.".to_string();
        let user_prompt = format!("existing_notes={prior_json}\ntracked_turns={buffer_json}");

        let cancel = mv_domain::cancel::CancelToken::new();
        let response = self
            .llm_gate
            .call(&cancel, LlmRequest {
                stage: "memory_finalize".into(),
                system_prompt,
                user_prompt,
            })
            .await
            .map_err(|e| format!("llm finalize call failed: {e}"))?;

        let revised: HashMap<Category, String> =
            parse_tolerant(&response.text).ok_or_else(|| "llm response was not parseable JSON".to_string())?;

        let mut merged = prior.notes.clone();
        for (category, note) in revised {
            merged.insert(category, note);
        }

        let new_notes = KeyNotes {
            user_id: user_id.clone(),
            notes: merged,
            updated_at: Some(Utc::now()),
        };

        self.store
            .upsert_notes(StoreCredential::Privileged, new_notes.clone())
            .map_err(|e| format!("store upsert failed: {e}"))?;

        self.post_run.record_finalized(session_id, user_id, &prior, &new_notes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mv_llm::MockLlmClient;

    fn manager(dir: &std::path::Path) -> MemoryManager {
        let store = Arc::new(Store::in_memory());
        let llm = Arc::new(LlmGate::new(
            Arc::new(MockLlmClient::new("test").with_latency(Duration::from_millis(1))),
            Duration::from_secs(5),
            8,
        ));
        let post_run = Arc::new(PostRunWriter::new(dir));
        MemoryManager::new(store, llm, post_run, &DeadlinesConfig::default(), &MemoryConfig::default())
    }

    #[tokio::test]
    async fn empty_buffer_skips_without_llm_call() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(dir.path());
        mgr.load("s1");
        mgr.finalize("s1", &"u1".to_string()).await;
        let contents = std::fs::read_to_string(dir.path().join("s1_post-run.log")).unwrap();
        assert!(contents.contains("SKIPPED"));
        assert!(contents.contains("empty buffer"));
    }

    #[tokio::test]
    async fn chat_and_unknown_intents_are_never_tracked() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(dir.path());
        mgr.load("s1");
        mgr.track("s1", TrackedTurn {
            query: "hi".into(),
            intent: IntentTag::Chat,
            symbols: vec![],
            short_summary: "greeting".into(),
        });
        mgr.track("s1", TrackedTurn {
            query: "???".into(),
            intent: IntentTag::Unknown,
            symbols: vec![],
            short_summary: "unclear".into(),
        });
        assert_eq!(mgr.buffers.lock().get("s1").unwrap().len(), 0);
    }

    #[tokio::test]
    async fn tracked_price_check_survives_in_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(dir.path());
        mgr.load("s1");
        mgr.track("s1", TrackedTurn {
            query: "price of meta".into(),
            intent: IntentTag::PriceCheck,
            symbols: vec!["META".into()],
            short_summary: "asked about META price".into(),
        });
        assert_eq!(mgr.buffers.lock().get("s1").unwrap().len(), 1);
    }
}
