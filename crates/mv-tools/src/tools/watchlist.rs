//! Watchlist mutation (spec §4.5 #4): `{user_id, action, symbols[]?}` →
//! new watchlist snapshot; not cacheable; single-writer per user.
//!
//! Serialization is provided by `Store`'s per-row lock (spec §9:
//! "concurrent writers for the same row serialize via ... optimistic
//! update (watchlist)").

use std::sync::Arc;

use mv_domain::entities::{Watchlist, WatchlistAction};
use mv_domain::error::{Error, Result};
use mv_store::Store;
use serde::Deserialize;
use serde_json::Value;

use crate::tool::{Tool, ToolOutput};

#[derive(Debug, Deserialize)]
struct WatchlistInput {
    user_id: String,
    action: WatchlistAction,
    #[serde(default)]
    symbols: Vec<String>,
}

pub struct WatchlistTool {
    store: Arc<Store>,
}

impl WatchlistTool {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for WatchlistTool {
    fn id(&self) -> &str {
        "watchlist"
    }

    async fn call(&self, input: Value) -> Result<ToolOutput> {
        let input: WatchlistInput =
            serde_json::from_value(input).map_err(|e| Error::Validation(format!("watchlist input: {e}")))?;
        if matches!(input.action, WatchlistAction::Add | WatchlistAction::Remove) && input.symbols.is_empty() {
            return Err(Error::Validation("watchlist add/remove requires symbols".into()));
        }

        let mut watchlist: Watchlist = self.store.get_watchlist(&input.user_id);
        match input.action {
            WatchlistAction::Add => {
                for symbol in &input.symbols {
                    watchlist.add(symbol);
                }
                self.store.upsert_watchlist(watchlist.clone());
            }
            WatchlistAction::Remove => {
                for symbol in &input.symbols {
                    watchlist.remove(symbol);
                }
                self.store.upsert_watchlist(watchlist.clone());
            }
            WatchlistAction::View => {}
        }

        let payload = serde_json::json!({ "user_id": watchlist.user_id, "symbols": watchlist.symbols });
        Ok(ToolOutput::new(payload).with_confidence(1.0).with_relevance(1.0))
    }
}
