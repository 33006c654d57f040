//! Turn-level input/output types threaded through every agent graph
//! stage (spec §4.3, §3 "Utterance"). Generalizes the teacher's
//! `gateway::runtime::turn::{TurnContext, TurnEvent}` shape to the
//! market-data domain.

use mv_domain::entities::{EvidenceBundle, Intent, KeyNotes};
use mv_domain::frame::Sentiment;

/// One prior turn, kept only for short-term conversational context
/// (spec §4.3 stage 1 "recent turns").
#[derive(Debug, Clone)]
pub struct RecentTurn {
    pub query: String,
    pub response_summary: String,
}

/// Input to a single turn through the agent graph.
#[derive(Debug, Clone)]
pub struct TurnInput {
    pub session_id: String,
    pub user_id: String,
    pub turn_id: String,
    pub text: String,
    pub recent_turns: Vec<RecentTurn>,
    pub notes: Option<KeyNotes>,
    pub audio_requested: bool,
}

/// One chunk of a sentence-aware TTS stream (spec §4.3 stage 7), mapped
/// directly onto `ServerFrame::TtsChunk` by the edge transport.
#[derive(Debug, Clone)]
pub struct SpeechChunk {
    pub seq: u64,
    pub data: String,
    pub is_final: bool,
}

/// Output of a completed turn (spec §4.3 stage 5 "Respond" plus stage 7
/// "Speak").
#[derive(Debug, Clone)]
pub struct TurnOutput {
    pub response_text: String,
    pub sentiment: Sentiment,
    pub key_insights: Vec<String>,
    pub intents: Vec<Intent>,
    pub symbols: Vec<String>,
    pub watchlist_snapshot: Option<Vec<String>>,
    pub processing_time_ms: u64,
    pub evidence: EvidenceBundle,
    pub speech_chunks: Vec<SpeechChunk>,
    pub partial: bool,
}

impl TurnOutput {
    /// A response used when the turn was cancelled before producing
    /// anything (spec §9 "cancellation aborts with no response" — the
    /// graph itself never emits this; callers that raced a cancellation
    /// against `run_turn` and lost should simply not emit a frame. This
    /// constructor exists for the rare internal-fallback path where a
    /// stage fails unrecoverably but the turn must still end cleanly).
    pub fn fallback(reason: &str) -> Self {
        Self {
            response_text: format!("I wasn't able to complete that request ({reason}). Could you try rephrasing?"),
            sentiment: Sentiment::Neutral,
            key_insights: vec![],
            intents: vec![],
            symbols: vec![],
            watchlist_snapshot: None,
            processing_time_ms: 0,
            evidence: EvidenceBundle::default(),
            speech_chunks: vec![],
            partial: true,
        }
    }
}
