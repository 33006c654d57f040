//! Row shapes for the six user-facing tables (spec §2 "Store").

use chrono::{DateTime, Utc};
use mv_domain::entities::IntentTag;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRow {
    pub user_id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessageRow {
    pub session_id: String,
    pub sequence: u64,
    pub raw_text: String,
    pub intents: Vec<IntentTag>,
    pub symbols: Vec<String>,
    pub result_summary: String,
    pub processing_time_ms: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserPreferencesRow {
    pub user_id: String,
    #[serde(default)]
    pub preferred_topics: Vec<String>,
}

/// On-disk snapshot of the entire store, persisted as one JSON document
/// per table under the configured state directory (matches the teacher's
/// `sessions.json` single-file-per-table pattern).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreSnapshot {
    pub users: HashMap<String, UserRow>,
    pub sessions: HashMap<String, mv_domain::entities::Session>,
    pub messages: HashMap<String, Vec<ConversationMessageRow>>,
    pub notes: HashMap<String, mv_domain::entities::KeyNotes>,
    pub watchlists: HashMap<String, mv_domain::entities::Watchlist>,
    pub preferences: HashMap<String, UserPreferencesRow>,
}

/// Convenience constructor for a fresh, empty notes record.
pub fn empty_notes(user_id: &str) -> mv_domain::entities::KeyNotes {
    mv_domain::entities::KeyNotes {
        user_id: user_id.to_string(),
        notes: HashMap::new(),
        updated_at: None,
    }
}
