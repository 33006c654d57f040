//! Thin persistence adapter over the user-facing tables (spec §2, §9
//! "Row-level access & privileged writes").
//!
//! Backed by an in-process `parking_lot::RwLock`-guarded snapshot,
//! flushed to JSON under the configured state directory — a stand-in for
//! the out-of-scope vendor database/cache engines (spec §1). The shape of
//! the API (credentialed writes, natural-ID upserts) is what a real
//! database adapter would also need to satisfy.

use std::path::{Path, PathBuf};

use chrono::Utc;
use mv_domain::entities::{KeyNotes, Session, Watchlist};
use mv_domain::error::{Error, Result};
use parking_lot::RwLock;

use crate::tables::{ConversationMessageRow, StoreSnapshot, UserPreferencesRow, UserRow};

/// Distinguishes the trusted server credential (used by the core) from a
/// restricted, client-facing one. The core always uses `Privileged`;
/// `Restricted` exists so the type system documents which paths must
/// never be reachable from untrusted callers (spec §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreCredential {
    Privileged,
    Restricted,
}

pub struct Store {
    path: Option<PathBuf>,
    inner: RwLock<StoreSnapshot>,
}

impl Store {
    /// Construct a store backed by a JSON snapshot file. If the file does
    /// not exist yet, starts from an empty snapshot (matches the
    /// teacher's `SessionStore::new` permissive-load behavior).
    pub fn open(state_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(state_dir)?;
        let path = state_dir.join("store.json");
        let inner = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw).unwrap_or_default()
        } else {
            StoreSnapshot::default()
        };
        tracing::info!(path = %path.display(), "store loaded");
        Ok(Self {
            path: Some(path),
            inner: RwLock::new(inner),
        })
    }

    /// An in-memory-only store with no backing file (used by tests).
    pub fn in_memory() -> Self {
        Self {
            path: None,
            inner: RwLock::new(StoreSnapshot::default()),
        }
    }

    pub fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let snapshot = self.inner.read();
        let json = serde_json::to_string_pretty(&*snapshot)
            .map_err(|e| Error::Other(format!("serializing store snapshot: {e}")))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    // ── Users (referenced, never mutated by the core; spec §3) ───────

    pub fn seed_user(&self, user_id: &str, display_name: &str) {
        self.inner.write().users.insert(
            user_id.to_string(),
            UserRow {
                user_id: user_id.to_string(),
                display_name: display_name.to_string(),
            },
        );
    }

    pub fn user_known(&self, user_id: &str) -> bool {
        self.inner.read().users.contains_key(user_id)
    }

    // ── conversation_sessions ─────────────────────────────────────────

    pub fn upsert_session(&self, session: Session) {
        self.inner
            .write()
            .sessions
            .insert(session.session_id.clone(), session);
    }

    pub fn get_session(&self, session_id: &str) -> Option<Session> {
        self.inner.read().sessions.get(session_id).cloned()
    }

    pub fn list_active_sessions(&self) -> Vec<Session> {
        self.inner
            .read()
            .sessions
            .values()
            .filter(|s| s.is_active)
            .cloned()
            .collect()
    }

    /// Close a session row: sets `is_active=false`, `ended_at`, and
    /// `duration_seconds` (spec §4.1 `close`). Idempotent — closing an
    /// already-closed session is a no-op returning `false`.
    pub fn close_session(&self, session_id: &str) -> bool {
        let mut snapshot = self.inner.write();
        let Some(session) = snapshot.sessions.get_mut(session_id) else {
            return false;
        };
        if !session.is_active {
            return false;
        }
        let now = Utc::now();
        session.is_active = false;
        session.ended_at = Some(now);
        session.duration_seconds = Some((now - session.started_at).num_seconds());
        true
    }

    pub fn touch_heartbeat(&self, session_id: &str, now: chrono::DateTime<Utc>) {
        if let Some(session) = self.inner.write().sessions.get_mut(session_id) {
            session.last_heartbeat_at = now;
        }
    }

    // ── conversation_messages ─────────────────────────────────────────

    pub fn append_message(&self, row: ConversationMessageRow) {
        self.inner
            .write()
            .messages
            .entry(row.session_id.clone())
            .or_default()
            .push(row);
    }

    pub fn list_messages(&self, session_id: &str) -> Vec<ConversationMessageRow> {
        self.inner
            .read()
            .messages
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    // ── user_notes (privileged-write only; spec I2, I6, §9) ───────────

    pub fn get_notes(&self, user_id: &str) -> Option<KeyNotes> {
        self.inner.read().notes.get(user_id).cloned()
    }

    /// Upsert `user_notes`, keyed uniquely by `user_id` (spec I2). Only
    /// the privileged credential may write — anything else is rejected,
    /// matching the access-policy note in spec §9.
    pub fn upsert_notes(&self, credential: StoreCredential, notes: KeyNotes) -> Result<()> {
        if credential != StoreCredential::Privileged {
            return Err(Error::Unauthenticated);
        }
        self.inner.write().notes.insert(notes.user_id.clone(), notes);
        Ok(())
    }

    // ── user_watchlist ─────────────────────────────────────────────────

    pub fn get_watchlist(&self, user_id: &str) -> Watchlist {
        self.inner
            .read()
            .watchlists
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| Watchlist {
                user_id: user_id.to_string(),
                symbols: Vec::new(),
            })
    }

    pub fn upsert_watchlist(&self, watchlist: Watchlist) {
        self.inner
            .write()
            .watchlists
            .insert(watchlist.user_id.clone(), watchlist);
    }

    // ── user_preferences ────────────────────────────────────────────────

    pub fn get_preferences(&self, user_id: &str) -> UserPreferencesRow {
        self.inner
            .read()
            .preferences
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| UserPreferencesRow {
                user_id: user_id.to_string(),
                preferred_topics: Vec::new(),
            })
    }

    pub fn upsert_preferences(&self, prefs: UserPreferencesRow) {
        self.inner
            .write()
            .preferences
            .insert(prefs.user_id.clone(), prefs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mv_domain::entities::Session;

    #[test]
    fn close_session_is_idempotent() {
        let store = Store::in_memory();
        let now = Utc::now();
        store.upsert_session(Session::new("s1".into(), "u1".into(), "web".into(), now));
        assert!(store.close_session("s1"));
        assert!(!store.close_session("s1"));
        let session = store.get_session("s1").unwrap();
        assert!(!session.is_active);
        assert!(session.ended_at.is_some());
    }

    #[test]
    fn restricted_credential_cannot_write_notes() {
        let store = Store::in_memory();
        let notes = KeyNotes {
            user_id: "u1".into(),
            notes: Default::default(),
            updated_at: Some(Utc::now()),
        };
        let result = store.upsert_notes(StoreCredential::Restricted, notes);
        assert!(result.is_err());
        assert!(store.get_notes("u1").is_none());
    }

    #[test]
    fn privileged_credential_can_write_notes() {
        let store = Store::in_memory();
        let notes = KeyNotes {
            user_id: "u1".into(),
            notes: Default::default(),
            updated_at: Some(Utc::now()),
        };
        store
            .upsert_notes(StoreCredential::Privileged, notes)
            .unwrap();
        assert!(store.get_notes("u1").is_some());
    }

    #[test]
    fn notes_upsert_has_at_most_one_row_per_user() {
        let store = Store::in_memory();
        for i in 0..3 {
            let notes = KeyNotes {
                user_id: "u1".into(),
                notes: Default::default(),
                updated_at: Some(Utc::now() + chrono::Duration::seconds(i)),
            };
            store.upsert_notes(StoreCredential::Privileged, notes).unwrap();
        }
        assert_eq!(store.inner.read().notes.len(), 1);
    }

    #[test]
    fn list_active_sessions_excludes_closed() {
        let store = Store::in_memory();
        let now = Utc::now();
        store.upsert_session(Session::new("s1".into(), "u1".into(), "web".into(), now));
        store.upsert_session(Session::new("s2".into(), "u1".into(), "web".into(), now));
        store.close_session("s1");
        let active = store.list_active_sessions();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].session_id, "s2");
    }

    #[test]
    fn round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        store.upsert_session(Session::new("s1".into(), "u1".into(), "web".into(), Utc::now()));
        store.flush().unwrap();

        let reopened = Store::open(dir.path()).unwrap();
        assert!(reopened.get_session("s1").is_some());
    }
}
