//! Stage 1 — intent analysis (spec §4.3 "Analyze intent"). A single LLM
//! call classifies the turn into zero or more intents, each carrying its
//! own symbols/keywords/watchlist action; symbols are normalized through
//! `ticker_map` and capped at `MAX_TURN_SYMBOLS`.

use mv_domain::cancel::CancelToken;
use mv_domain::entities::{cap_symbols, Intent, IntentTag};
use mv_domain::json_tolerant::parse_tolerant;
use mv_llm::{LlmGate, LlmRequest};
use serde::Deserialize;

use crate::ticker_map;
use crate::types::TurnInput;

#[derive(Debug, Deserialize)]
struct RawIntent {
    tag: IntentTag,
    #[serde(default)]
    symbols: Vec<String>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    watchlist_action: Option<mv_domain::entities::WatchlistAction>,
}

#[derive(Debug, Deserialize)]
struct RawIntentResponse {
    intents: Vec<RawIntent>,
}

const SYSTEM_PROMPT: &str = "You classify a user's spoken request about stocks and markets into one \
    or more intents. Valid tags: price_check, news_search, research, comparison, watchlist, chat, unknown. \
    For watchlist intents, include a watchlist_action of add, remove, or view. Extract every company name \
    or ticker symbol mentioned. Respond with a JSON object: {\"intents\": [{\"tag\": ..., \"symbols\": [...], \
    \"keywords\": [...], \"watchlist_action\": ...}]}.";

/// Classify a turn's text into intents. Never fails the turn: an LLM or
/// parse failure degrades to a single `unknown` intent with no symbols
/// (spec §9 "stage failure semantics").
pub async fn analyze(gate: &LlmGate, cancel: &CancelToken, input: &TurnInput) -> Vec<Intent> {
    let user_prompt = format!("text={}\nrecent_turns={}", input.text, recent_context(input));

    let response = gate
        .call(cancel, LlmRequest {
            stage: "intent_analysis".into(),
            system_prompt: SYSTEM_PROMPT.into(),
            user_prompt,
        })
        .await;

    let Ok(response) = response else {
        tracing::warn!(turn_id = %input.turn_id, "intent analysis llm call failed, falling back to unknown");
        return vec![fallback_intent()];
    };

    let Some(parsed) = parse_tolerant::<RawIntentResponse>(&response.text) else {
        tracing::warn!(turn_id = %input.turn_id, "intent analysis response was not parseable, falling back to unknown");
        return vec![fallback_intent()];
    };

    if parsed.intents.is_empty() {
        return vec![fallback_intent()];
    }

    parsed
        .intents
        .into_iter()
        .map(|raw| {
            let mut symbols: Vec<String> = raw.symbols.iter().map(|s| ticker_map::normalize(s)).collect();
            symbols.dedup();
            cap_symbols(&mut symbols);
            Intent {
                tag: raw.tag,
                symbols,
                keywords: raw.keywords,
                watchlist_action: raw.watchlist_action,
            }
        })
        .collect()
}

fn recent_context(input: &TurnInput) -> String {
    input
        .recent_turns
        .iter()
        .map(|t| format!("(q={} a={})", t.query, t.response_summary))
        .collect::<Vec<_>>()
        .join(" ")
}

fn fallback_intent() -> Intent {
    Intent {
        tag: IntentTag::Unknown,
        symbols: vec![],
        keywords: vec![],
        watchlist_action: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mv_llm::MockLlmClient;
    use std::sync::Arc;
    use std::time::Duration;

    fn turn(text: &str) -> TurnInput {
        TurnInput {
            session_id: "s1".into(),
            user_id: "u1".into(),
            turn_id: "t1".into(),
            text: text.into(),
            recent_turns: vec![],
            notes: None,
            audio_requested: false,
        }
    }

    struct CannedClient(String);

    #[async_trait::async_trait]
    impl mv_llm::LlmClient for CannedClient {
        async fn complete(&self, _req: mv_llm::LlmRequest) -> mv_domain::error::Result<mv_llm::LlmResponse> {
            Ok(mv_llm::LlmResponse {
                text: self.0.clone(),
                model: "canned".into(),
            })
        }
    }

    #[tokio::test]
    async fn parses_well_formed_intent_response() {
        let canned = r#"{"intents": [{"tag": "price_check", "symbols": ["apple"], "keywords": []}]}"#;
        let gate = LlmGate::new(Arc::new(CannedClient(canned.into())), Duration::from_secs(5), 8);
        let cancel = CancelToken::new();
        let intents = analyze(&gate, &cancel, &turn("what's apple at")).await;
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].tag, IntentTag::PriceCheck);
        assert_eq!(intents[0].symbols, vec!["AAPL".to_string()]);
    }

    #[tokio::test]
    async fn falls_back_to_unknown_on_garbage_response() {
        let gate = LlmGate::new(Arc::new(CannedClient("not json".into())), Duration::from_secs(5), 8);
        let cancel = CancelToken::new();
        let intents = analyze(&gate, &cancel, &turn("huh")).await;
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].tag, IntentTag::Unknown);
    }

    #[tokio::test]
    async fn falls_back_to_unknown_on_empty_intents_array() {
        let gate = LlmGate::new(Arc::new(CannedClient(r#"{"intents": []}"#.into())), Duration::from_secs(5), 8);
        let cancel = CancelToken::new();
        let intents = analyze(&gate, &cancel, &turn("...")).await;
        assert_eq!(intents[0].tag, IntentTag::Unknown);
    }
}
