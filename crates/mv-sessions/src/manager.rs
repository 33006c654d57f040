//! `SessionManager` (spec §4.1): admission, per-session turn
//! serialization, and close-path persistence. Generalizes the teacher's
//! `sa_sessions::SessionStore` (an `RwLock<HashMap<..>>` keyed registry
//! with a `TraceEvent` on every state change) from a single
//! `SessionEntry` record to a handle that also gates concurrent turns
//! and cascades cancellation into the agent graph.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mv_agent::{AgentGraph, RecentTurn, TurnInput, TurnOutput};
use mv_domain::cancel::CancelToken;
use mv_domain::config::SessionsConfig;
use mv_domain::entities::{Session, SessionId, UserId};
use mv_domain::error::{Error, Result};
use mv_domain::trace::TraceEvent;
use mv_logger::TranscriptWriter;
use mv_memory::MemoryManager;
use mv_store::retry::with_backoff;
use mv_store::Store;
use parking_lot::RwLock as SyncRwLock;
use parking_lot::Mutex as SyncMutex;
use tokio::sync::Mutex as AsyncMutex;

use crate::state::SessionState;

const MAX_RECENT_TURNS: usize = 5;

fn sentiment_label(sentiment: mv_domain::frame::Sentiment) -> &'static str {
    use mv_domain::frame::Sentiment;
    match sentiment {
        Sentiment::Positive => "positive",
        Sentiment::Neutral => "neutral",
        Sentiment::Negative => "negative",
    }
}

struct SessionRecord {
    user_id: UserId,
    source: String,
    cancel: CancelToken,
    state: SyncMutex<SessionState>,
    last_heartbeat_at: SyncMutex<chrono::DateTime<Utc>>,
    recent_turns: SyncMutex<Vec<RecentTurn>>,
    /// Held for the duration of a turn — serializes turns per session
    /// (spec §4.1 "a session processes at most one turn at a time").
    turn_gate: AsyncMutex<u64>,
    /// The in-flight turn's own cancellation child, set while a turn runs
    /// so `barge_in` can cancel just that turn without poisoning the
    /// session's token for turns that follow (spec §5 barge-in).
    current_turn_cancel: SyncMutex<Option<CancelToken>>,
}

pub struct SessionManager {
    store: Arc<Store>,
    agent: Arc<AgentGraph>,
    memory: Arc<MemoryManager>,
    transcripts: Arc<TranscriptWriter>,
    config: SessionsConfig,
    sessions: SyncRwLock<HashMap<SessionId, Arc<SessionRecord>>>,
}

impl SessionManager {
    pub fn new(
        store: Arc<Store>,
        agent: Arc<AgentGraph>,
        memory: Arc<MemoryManager>,
        transcripts: Arc<TranscriptWriter>,
        config: SessionsConfig,
    ) -> Self {
        Self {
            store,
            agent,
            memory,
            transcripts,
            config,
            sessions: SyncRwLock::new(HashMap::new()),
        }
    }

    /// Admit a new session for `user_id` (spec §4.1 `admit`). Fails with
    /// `UserUnknown` when the deployment requires pre-registered users
    /// and the user isn't seeded.
    pub fn admit(&self, user_id: &str, source: &str) -> Result<SessionId> {
        if self.config.require_known_users && !self.store.user_known(user_id) {
            return Err(Error::UserUnknown(user_id.to_string()));
        }

        let session_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        self.store
            .upsert_session(Session::new(session_id.clone(), user_id.to_string(), source.to_string(), now));
        self.memory.load(&session_id);
        self.transcripts.session_header(&session_id, user_id, "", now, source);

        let record = Arc::new(SessionRecord {
            user_id: user_id.to_string(),
            source: source.to_string(),
            cancel: CancelToken::new(),
            state: SyncMutex::new(SessionState::Open),
            last_heartbeat_at: SyncMutex::new(now),
            recent_turns: SyncMutex::new(Vec::new()),
            turn_gate: AsyncMutex::new(0),
            current_turn_cancel: SyncMutex::new(None),
        });
        self.sessions.write().insert(session_id.clone(), record);

        TraceEvent::SessionAdmitted {
            session_id: session_id.clone(),
            user_id: user_id.to_string(),
            source: source.to_string(),
        }
        .emit();

        Ok(session_id)
    }

    pub fn is_active(&self, session_id: &str) -> bool {
        self.sessions.read().contains_key(session_id)
    }

    /// Record a heartbeat (spec §4.2).
    pub fn touch_heartbeat(&self, session_id: &str) {
        let now = Utc::now();
        if let Some(record) = self.sessions.read().get(session_id) {
            *record.last_heartbeat_at.lock() = now;
        }
        self.store.touch_heartbeat(session_id, now);
    }

    /// Run one turn through the agent graph, serialized against any
    /// other turn on the same session (spec §4.1). Returns `None` when
    /// the session is unknown, already closing, or the turn was
    /// cancelled before producing output.
    pub async fn on_text_turn(&self, session_id: &str, text: &str, audio_requested: bool) -> Option<TurnOutput> {
        let record = self.sessions.read().get(session_id).cloned()?;

        {
            let state = *record.state.lock();
            if !state.can_start_turn() {
                return None;
            }
        }

        let mut sequence_guard = record.turn_gate.lock().await;
        *sequence_guard += 1;
        let sequence = *sequence_guard;

        {
            let mut state = record.state.lock();
            if !state.can_start_turn() {
                return None;
            }
            *state = SessionState::Streaming;
        }

        TraceEvent::TurnStarted {
            session_id: session_id.to_string(),
            sequence,
        }
        .emit();

        self.transcripts.user_query(session_id, text, Utc::now(), &record.source);

        let notes = self.store.get_notes(&record.user_id);
        let recent_turns = record.recent_turns.lock().clone();
        let input = TurnInput {
            session_id: session_id.to_string(),
            user_id: record.user_id.clone(),
            turn_id: uuid::Uuid::new_v4().to_string(),
            text: text.to_string(),
            recent_turns,
            notes,
            audio_requested,
        };

        let turn_cancel = record.cancel.child();
        *record.current_turn_cancel.lock() = Some(turn_cancel.clone());

        let output = self.agent.run_turn(&turn_cancel, input).await;

        *record.current_turn_cancel.lock() = None;
        {
            let mut state = record.state.lock();
            if *state == SessionState::Streaming {
                *state = SessionState::Open;
            }
        }
        drop(sequence_guard);

        if let Some(output) = &output {
            self.transcripts.agent_response(
                session_id,
                &output.response_text,
                sentiment_label(output.sentiment),
                &output.key_insights,
                output.processing_time_ms,
            );
            record.recent_turns.lock().push(RecentTurn {
                query: text.to_string(),
                response_summary: output.response_text.chars().take(160).collect(),
            });
            record.recent_turns.lock().truncate(MAX_RECENT_TURNS);
            TraceEvent::TurnCompleted {
                session_id: session_id.to_string(),
                sequence,
                processing_time_ms: output.processing_time_ms,
                partial: output.partial,
            }
            .emit();
        }

        output
    }

    /// Close a session (spec §4.1 `close`): cancels any in-flight turn,
    /// waits for it to unwind, finalizes memory, and persists the close
    /// with bounded retry on the fallible flush. Idempotent.
    pub async fn close(&self, session_id: &str, cause: &str) -> bool {
        let Some(record) = self.sessions.write().remove(session_id) else {
            return false;
        };

        *record.state.lock() = SessionState::Closing;
        record.cancel.cancel();

        let _ = record.turn_gate.lock().await;

        self.memory.finalize(session_id, &record.user_id).await;

        let closed_now = self.store.close_session(session_id);
        let store = self.store.clone();
        let flush_result = with_backoff(self.config.close_retry_attempts, Duration::from_millis(50), move || {
            let store = store.clone();
            async move { store.flush() }
        })
        .await;
        let persisted = flush_result.is_ok();
        if let Err(e) = flush_result {
            tracing::warn!(session_id, error = %e, "failed to persist session close after retries");
        }

        let duration_seconds = self
            .store
            .get_session(session_id)
            .and_then(|s| s.duration_seconds)
            .unwrap_or(0);
        self.transcripts.session_footer(session_id, Utc::now(), duration_seconds);

        TraceEvent::SessionClosed {
            session_id: session_id.to_string(),
            cause: cause.to_string(),
            duration_seconds,
            persisted,
        }
        .emit();

        *record.state.lock() = SessionState::Closed;
        closed_now
    }

    /// Close every active session (spec §4.1 `close_all`, used at
    /// shutdown), bounded by `SHUTDOWN_DEADLINE`.
    pub async fn close_all(&self, reason: &str) {
        let ids: Vec<String> = self.sessions.read().keys().cloned().collect();
        let deadline = Duration::from_secs(self.config.shutdown_deadline_secs);
        let closes = ids.iter().map(|id| self.close(id, reason));
        let _ = tokio::time::timeout(deadline, futures_util::future::join_all(closes)).await;
    }

    /// Interrupt the turn currently in flight on `session_id`, if any
    /// (spec §5 barge-in). Returns `true` when a turn was actually
    /// cancelled. The caller (the WebSocket edge) is responsible for
    /// dropping its own queued-but-unsent TTS chunks and emitting
    /// `streaming_interrupted` — this only stops the agent graph.
    pub fn barge_in(&self, session_id: &str) -> bool {
        let Some(record) = self.sessions.read().get(session_id).cloned() else {
            return false;
        };
        let guard = record.current_turn_cancel.lock();
        match &*guard {
            Some(turn_cancel) => {
                turn_cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Session ids whose last heartbeat is older than `idle_limit`,
    /// relative to `now` (spec §4.2 "Reap"). Used by `HeartbeatMonitor`.
    pub fn idle_sessions(&self, now: chrono::DateTime<Utc>) -> Vec<SessionId> {
        let limit = chrono::Duration::seconds(self.config.idle_limit_secs as i64);
        self.sessions
            .read()
            .iter()
            .filter(|(_, record)| now - *record.last_heartbeat_at.lock() > limit)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn config(&self) -> &SessionsConfig {
        &self.config
    }
}
