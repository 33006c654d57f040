//! Preferences read (spec §4.5 #5): `{user_id}` → preferred topics and
//! watchlist; cacheable in-process 60 s.

use std::sync::Arc;
use std::time::Duration;

use mv_domain::error::{Error, Result};
use mv_store::Store;
use serde::Deserialize;
use serde_json::Value;

use crate::tool::{Tool, ToolOutput};

#[derive(Debug, Deserialize)]
struct PreferencesInput {
    user_id: String,
}

pub struct PreferencesTool {
    store: Arc<Store>,
    cache_ttl: Duration,
}

impl PreferencesTool {
    pub fn new(store: Arc<Store>, cache_ttl: Duration) -> Self {
        Self { store, cache_ttl }
    }
}

#[async_trait::async_trait]
impl Tool for PreferencesTool {
    fn id(&self) -> &str {
        "preferences"
    }

    fn cache_ttl(&self) -> Option<Duration> {
        Some(self.cache_ttl)
    }

    async fn call(&self, input: Value) -> Result<ToolOutput> {
        let input: PreferencesInput =
            serde_json::from_value(input).map_err(|e| Error::Validation(format!("preferences input: {e}")))?;
        if input.user_id.trim().is_empty() {
            return Err(Error::Validation("preferences requires a user_id".into()));
        }

        let prefs = self.store.get_preferences(&input.user_id);
        let watchlist = self.store.get_watchlist(&input.user_id);
        let payload = serde_json::json!({
            "user_id": input.user_id,
            "preferred_topics": prefs.preferred_topics,
            "watchlist": watchlist.symbols,
        });
        Ok(ToolOutput::new(payload).with_confidence(1.0).with_relevance(1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mv_store::tables::UserPreferencesRow;

    #[tokio::test]
    async fn reads_seeded_preferences_and_watchlist() {
        let store = Arc::new(Store::in_memory());
        store.upsert_preferences(UserPreferencesRow {
            user_id: "u1".into(),
            preferred_topics: vec!["earnings".into()],
        });
        let tool = PreferencesTool::new(store, Duration::from_secs(60));
        let out = tool.call(serde_json::json!({ "user_id": "u1" })).await.unwrap();
        assert_eq!(out.payload["preferred_topics"], serde_json::json!(["earnings"]));
    }

    #[tokio::test]
    async fn rejects_empty_user_id() {
        let store = Arc::new(Store::in_memory());
        let tool = PreferencesTool::new(store, Duration::from_secs(60));
        let result = tool.call(serde_json::json!({ "user_id": "" })).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
