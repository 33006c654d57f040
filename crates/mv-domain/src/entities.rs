//! Core domain entities (spec §3). These are semantic types shared by
//! every crate in the workspace — no I/O, no behavior beyond simple
//! constructors and helpers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type SessionId = String;
pub type UserId = String;

/// Where the session's transport originates. Out-of-scope transports are
/// free-form strings (the edge only cares about a handful of well-known
/// values, but nothing here enforces that at the type level).
pub type Source = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub started_at: DateTime<Utc>,
    pub last_heartbeat_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub duration_seconds: Option<i64>,
    pub source: Source,
}

impl Session {
    pub fn new(session_id: SessionId, user_id: UserId, source: Source, now: DateTime<Utc>) -> Self {
        Self {
            session_id,
            user_id,
            started_at: now,
            last_heartbeat_at: now,
            ended_at: None,
            is_active: true,
            duration_seconds: None,
            source,
        }
    }
}

/// One completed user turn (spec §3 "Utterance").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utterance {
    pub session_id: SessionId,
    pub sequence: u64,
    pub raw_text: String,
    pub detected_intents: Vec<Intent>,
    pub symbols: Vec<String>,
    pub result_summary: String,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentTag {
    PriceCheck,
    NewsSearch,
    Research,
    Comparison,
    Watchlist,
    Chat,
    Unknown,
}

impl IntentTag {
    /// Intents that the memory tracker should never persist (spec §9 open
    /// question (a), resolved: `chat` and `unknown` never contribute).
    pub fn contributes_to_memory(self) -> bool {
        !matches!(self, IntentTag::Chat | IntentTag::Unknown)
    }

    /// Whether this intent needs checklist items built for it (spec §4.3
    /// stage 2: research/comparison get one item per symbol × keyword
    /// group; everything else either gets a single lookup item or none).
    pub fn needs_checklist(self) -> bool {
        matches!(self, IntentTag::Research | IntentTag::Comparison)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchlistAction {
    Add,
    Remove,
    View,
}

/// One detected intent within a turn (spec §3 "Intent").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub tag: IntentTag,
    pub symbols: Vec<String>,
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watchlist_action: Option<WatchlistAction>,
}

/// A planned sub-query that must complete (or time out) before
/// summarization (spec §3 "Checklist Item").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub turn_id: String,
    pub index: usize,
    pub query: String,
    pub target_symbols: Vec<String>,
    pub keywords: Vec<String>,
    pub min_result_requirement: usize,
    pub completed: bool,
    pub result_count: usize,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ChecklistItem {
    pub fn new(
        turn_id: impl Into<String>,
        index: usize,
        query: impl Into<String>,
        target_symbols: Vec<String>,
        keywords: Vec<String>,
    ) -> Self {
        Self {
            turn_id: turn_id.into(),
            index,
            query: query.into(),
            target_symbols,
            keywords,
            min_result_requirement: 5,
            completed: false,
            result_count: 0,
            completed_at: None,
        }
    }
}

/// A single piece of evidence gathered by a tool call (spec §3 "Tool
/// Result", aggregated per-turn).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub tool_id: String,
    pub url: Option<String>,
    pub relevance_score: f64,
    pub published_at: Option<DateTime<Utc>>,
    pub confidence: f64,
    pub payload: serde_json::Value,
    pub citations: Vec<String>,
}

/// The aggregated evidence for a turn, ranked and deduped (spec §4.3
/// "Tie-breaks & numeric semantics").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvidenceBundle {
    pub items: Vec<EvidenceItem>,
    pub partial: bool,
}

impl EvidenceBundle {
    /// Insert an item, deduping by URL (first-seen wins, matching the
    /// teacher's cache/registry "first registration wins" convention).
    pub fn push_deduped(&mut self, item: EvidenceItem) {
        if let Some(url) = &item.url {
            if self.items.iter().any(|existing| existing.url.as_deref() == Some(url.as_str())) {
                return;
            }
        }
        self.items.push(item);
    }

    /// Sort by relevance score descending, then freshness (most recent
    /// first) — spec §4.3 evidence ranking tie-break.
    pub fn rank(&mut self) {
        self.items.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.published_at.cmp(&a.published_at))
        });
    }

    /// Mean confidence across completed items; 0 if empty (spec §4.3).
    pub fn confidence(&self) -> f64 {
        if self.items.is_empty() {
            return 0.0;
        }
        self.items.iter().map(|i| i.confidence).sum::<f64>() / self.items.len() as f64
    }
}

/// Long-term per-user memory categories (spec §3 "Key Notes").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Stocks,
    Investment,
    Trading,
    Research,
    Watchlist,
    News,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Stocks,
        Category::Investment,
        Category::Trading,
        Category::Research,
        Category::Watchlist,
        Category::News,
    ];
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KeyNotes {
    pub user_id: UserId,
    #[serde(default)]
    pub notes: HashMap<Category, String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Ordered, deduped, uppercase symbol set, capped at `MAX_WATCHLIST_SYMBOLS`
/// (spec §3 "Watchlist").
pub const MAX_WATCHLIST_SYMBOLS: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Watchlist {
    pub user_id: UserId,
    pub symbols: Vec<String>,
}

impl Watchlist {
    pub fn add(&mut self, symbol: &str) {
        let symbol = symbol.to_uppercase();
        if !self.symbols.contains(&symbol) && self.symbols.len() < MAX_WATCHLIST_SYMBOLS {
            self.symbols.push(symbol);
        }
    }

    pub fn remove(&mut self, symbol: &str) {
        let symbol = symbol.to_uppercase();
        self.symbols.retain(|s| s != &symbol);
    }
}

/// Maximum number of symbols tracked per turn (spec §4.3 tie-break).
pub const MAX_TURN_SYMBOLS: usize = 10;

/// Cap symbols to `MAX_TURN_SYMBOLS`, returning whether any were dropped.
pub fn cap_symbols(symbols: &mut Vec<String>) -> bool {
    if symbols.len() > MAX_TURN_SYMBOLS {
        symbols.truncate(MAX_TURN_SYMBOLS);
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cap_symbols_drops_extras() {
        let mut symbols: Vec<String> = (0..11).map(|i| format!("SYM{i}")).collect();
        assert!(cap_symbols(&mut symbols));
        assert_eq!(symbols.len(), MAX_TURN_SYMBOLS);
    }

    #[test]
    fn cap_symbols_noop_under_limit() {
        let mut symbols: Vec<String> = (0..5).map(|i| format!("SYM{i}")).collect();
        assert!(!cap_symbols(&mut symbols));
        assert_eq!(symbols.len(), 5);
    }

    #[test]
    fn watchlist_add_dedupes_and_uppercases() {
        let mut wl = Watchlist::default();
        wl.add("meta");
        wl.add("META");
        assert_eq!(wl.symbols, vec!["META".to_string()]);
    }

    #[test]
    fn watchlist_caps_at_max() {
        let mut wl = Watchlist::default();
        for i in 0..60 {
            wl.add(&format!("S{i}"));
        }
        assert_eq!(wl.symbols.len(), MAX_WATCHLIST_SYMBOLS);
    }

    #[test]
    fn evidence_bundle_dedupes_by_url() {
        let mut bundle = EvidenceBundle::default();
        bundle.push_deduped(EvidenceItem {
            tool_id: "news".into(),
            url: Some("https://example.com/a".into()),
            relevance_score: 0.9,
            published_at: None,
            confidence: 0.8,
            payload: serde_json::json!({}),
            citations: vec![],
        });
        bundle.push_deduped(EvidenceItem {
            tool_id: "news".into(),
            url: Some("https://example.com/a".into()),
            relevance_score: 0.5,
            published_at: None,
            confidence: 0.1,
            payload: serde_json::json!({}),
            citations: vec![],
        });
        assert_eq!(bundle.items.len(), 1);
        assert_eq!(bundle.items[0].relevance_score, 0.9);
    }

    #[test]
    fn evidence_bundle_confidence_zero_when_empty() {
        let bundle = EvidenceBundle::default();
        assert_eq!(bundle.confidence(), 0.0);
    }

    #[test]
    fn evidence_bundle_rank_orders_by_relevance_then_freshness() {
        let mut bundle = EvidenceBundle::default();
        bundle.items.push(EvidenceItem {
            tool_id: "t".into(),
            url: Some("u1".into()),
            relevance_score: 0.5,
            published_at: Some(Utc::now()),
            confidence: 0.5,
            payload: serde_json::json!({}),
            citations: vec![],
        });
        bundle.items.push(EvidenceItem {
            tool_id: "t".into(),
            url: Some("u2".into()),
            relevance_score: 0.9,
            published_at: Some(Utc::now()),
            confidence: 0.5,
            payload: serde_json::json!({}),
            citations: vec![],
        });
        bundle.rank();
        assert_eq!(bundle.items[0].url.as_deref(), Some("u2"));
    }

    #[test]
    fn intent_tag_memory_contribution() {
        assert!(!IntentTag::Chat.contributes_to_memory());
        assert!(!IntentTag::Unknown.contributes_to_memory());
        assert!(IntentTag::PriceCheck.contributes_to_memory());
    }
}
