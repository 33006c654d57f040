//! Provider-agnostic LLM client trait (spec §1: the real vendor endpoint
//! is an external collaborator, referenced only by this interface).

use mv_domain::error::Result;

#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub stage: String,
    pub system_prompt: String,
    pub user_prompt: String,
}

#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub model: String,
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse>;
}

/// Deterministic mock adapter used in place of a real LLM endpoint. Each
/// call is resolved by keyword heuristics over the stage's `user_prompt`
/// into the stage-appropriate JSON schema its caller expects (intent
/// classification, response generation, memory finalization) — enough to
/// exercise the full pipeline end to end without a network dependency.
pub struct MockLlmClient {
    pub model: String,
    pub latency: std::time::Duration,
}

impl MockLlmClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            latency: std::time::Duration::from_millis(5),
        }
    }

    pub fn with_latency(mut self, latency: std::time::Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait::async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse> {
        tokio::time::sleep(self.latency).await;
        let text = match req.stage.as_str() {
            "intent_analysis" => mock_stage::intent_response(&req.user_prompt),
            "response_generation" => mock_stage::response_text(&req.user_prompt),
            "memory_finalize" => mock_stage::memory_notes(&req.user_prompt),
            _ => mock_stage::response_text(&req.user_prompt),
        };
        Ok(LlmResponse { text, model: self.model.clone() })
    }
}

/// Keyword heuristics standing in for the real model's classification and
/// drafting, one function per stage. Deliberately simple: it only needs
/// to exercise the pipeline's JSON contracts, not produce good prose.
mod mock_stage {
    /// A short table of symbols the mock recognizes directly in the raw
    /// turn text (already-uppercase tickers, which is how the seed
    /// scenarios write them); case-insensitive company names are handled
    /// upstream by `mv-agent::ticker_map` once the intent comes back.
    fn extract_symbols(text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_ascii_alphanumeric() && c != '.')
            .filter(|tok| {
                let len = tok.chars().count();
                (2..=6).contains(&len) && tok.chars().all(|c| c.is_ascii_uppercase() || c == '.')
            })
            .map(|tok| tok.to_string())
            .collect()
    }

    /// Pull the raw turn text back out of `intent::analyze`'s
    /// `"text={}\nrecent_turns={}"` prompt framing.
    fn raw_text(user_prompt: &str) -> &str {
        user_prompt
            .strip_prefix("text=")
            .and_then(|rest| rest.split("\nrecent_turns=").next())
            .unwrap_or(user_prompt)
    }

    pub fn intent_response(user_prompt: &str) -> String {
        let text = raw_text(user_prompt);
        let lower = text.to_lowercase();
        let symbols = extract_symbols(text);
        let symbols_json = serde_json::to_string(&symbols).unwrap_or_else(|_| "[]".into());

        let mut intents: Vec<String> = Vec::new();

        if lower.contains("watchlist") || lower.contains("remove") {
            let action = if lower.contains("add") {
                "add"
            } else if lower.contains("remove") {
                "remove"
            } else {
                "view"
            };
            intents.push(format!(
                r#"{{"tag": "watchlist", "symbols": {symbols_json}, "keywords": [], "watchlist_action": "{action}"}}"#
            ));
        }
        if lower.contains("compare") || lower.contains(" vs ") || lower.contains("versus") {
            intents.push(format!(r#"{{"tag": "comparison", "symbols": {symbols_json}, "keywords": []}}"#));
        }
        if lower.contains("price") {
            intents.push(format!(r#"{{"tag": "price_check", "symbols": {symbols_json}, "keywords": []}}"#));
        }
        if lower.contains("news") {
            intents.push(format!(r#"{{"tag": "news_search", "symbols": {symbols_json}, "keywords": []}}"#));
        }
        if lower.contains("research") || lower.contains("everything about") || lower.contains("fundamentals") {
            intents.push(format!(r#"{{"tag": "research", "symbols": {symbols_json}, "keywords": []}}"#));
        }
        if intents.is_empty() {
            intents.push(format!(r#"{{"tag": "unknown", "symbols": {symbols_json}, "keywords": []}}"#));
        }

        format!(r#"{{"intents": [{}]}}"#, intents.join(", "))
    }

    pub fn response_text(user_prompt: &str) -> String {
        let lower = user_prompt.to_lowercase();
        let sentiment = if lower.contains("gain") || lower.contains("up") || lower.contains("higher") {
            "positive"
        } else if lower.contains("loss") || lower.contains("down") || lower.contains("lower") {
            "negative"
        } else {
            "neutral"
        };
        r#"{"text": "Here's what I found based on the latest available data.", "sentiment": ""#
            .to_string()
            + sentiment
            + r#"", "key_insights": []}"#
    }

    pub fn memory_notes(_user_prompt: &str) -> String {
        r#"{"stocks": "Tracked recent ticker and watchlist activity this session."}"#.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::mock_stage;

    #[test]
    fn intent_mock_classifies_price_check() {
        let prompt = "text=What's the price of META?\nrecent_turns=";
        let json = mock_stage::intent_response(prompt);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let intents = parsed["intents"].as_array().unwrap();
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0]["tag"], "price_check");
        assert_eq!(intents[0]["symbols"][0], "META");
    }

    #[test]
    fn intent_mock_classifies_comparison_with_two_symbols() {
        let prompt = "text=Compare NVDA and AMD\nrecent_turns=";
        let json = mock_stage::intent_response(prompt);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let intents = parsed["intents"].as_array().unwrap();
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0]["tag"], "comparison");
        let symbols: Vec<String> =
            serde_json::from_value(intents[0]["symbols"].clone()).unwrap();
        assert_eq!(symbols, vec!["NVDA".to_string(), "AMD".to_string()]);
    }

    #[test]
    fn intent_mock_classifies_multi_intent() {
        let prompt = "text=What's META's price and latest news?\nrecent_turns=";
        let json = mock_stage::intent_response(prompt);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let tags: Vec<String> = parsed["intents"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["tag"].as_str().unwrap().to_string())
            .collect();
        assert!(tags.contains(&"price_check".to_string()));
        assert!(tags.contains(&"news_search".to_string()));
    }

    #[test]
    fn intent_mock_classifies_watchlist_actions() {
        let add: serde_json::Value =
            serde_json::from_str(&mock_stage::intent_response("text=Add META to my watchlist\nrecent_turns="))
                .unwrap();
        assert_eq!(add["intents"][0]["watchlist_action"], "add");

        let show: serde_json::Value =
            serde_json::from_str(&mock_stage::intent_response("text=Show my watchlist\nrecent_turns=")).unwrap();
        assert_eq!(show["intents"][0]["watchlist_action"], "view");

        let remove: serde_json::Value =
            serde_json::from_str(&mock_stage::intent_response("text=Remove META\nrecent_turns=")).unwrap();
        assert_eq!(remove["intents"][0]["watchlist_action"], "remove");
    }

    #[test]
    fn response_mock_produces_parseable_json() {
        let json = mock_stage::response_text("query=x\nevidence=[]");
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["sentiment"], "neutral");
        assert!(parsed["text"].as_str().unwrap().len() > 0);
    }
}
