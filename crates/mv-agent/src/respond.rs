//! Stage 5 — response generation (spec §4.3 "Generate response"). One
//! LLM call turns the ranked evidence bundle into spoken-style prose,
//! a sentiment, and a short list of key insights. On LLM failure or an
//! unparseable response, falls back to a template built directly off
//! the evidence so the turn still produces something audible.

use mv_domain::cancel::CancelToken;
use mv_domain::entities::{EvidenceBundle, Intent};
use mv_domain::frame::Sentiment;
use mv_domain::json_tolerant::parse_tolerant;
use mv_llm::{LlmGate, LlmRequest};
use serde::Deserialize;

use crate::types::TurnInput;

#[derive(Debug, Deserialize)]
struct RawResponse {
    text: String,
    #[serde(default)]
    sentiment: Option<Sentiment>,
    #[serde(default)]
    key_insights: Vec<String>,
}

pub struct Response {
    pub text: String,
    pub sentiment: Sentiment,
    pub key_insights: Vec<String>,
}

const SYSTEM_PROMPT: &str = "You are a concise spoken voice assistant for market-data questions. Given \
    the user's request and gathered evidence, respond with a JSON object: {\"text\": \"...\", \"sentiment\": \
    \"positive\"|\"neutral\"|\"negative\", \"key_insights\": [\"...\"]}. Keep text under four sentences and \
    speak naturally, as if read aloud.";

/// Generate the spoken response for a turn (spec §4.3 stage 5).
pub async fn generate(gate: &LlmGate, cancel: &CancelToken, input: &TurnInput, intents: &[Intent], evidence: &EvidenceBundle) -> Response {
    let evidence_json = serde_json::to_string(&evidence.items).unwrap_or_default();
    let notes_json = input
        .notes
        .as_ref()
        .map(|n| serde_json::to_string(&n.notes).unwrap_or_default())
        .unwrap_or_default();
    let user_prompt = format!(
        "query={}\nintents={}\nevidence={}\nuser_notes={}\nconfidence={:.2}\npartial_evidence={}",
        input.text,
        serde_json::to_string(intents).unwrap_or_default(),
        evidence_json,
        notes_json,
        evidence.confidence(),
        evidence.partial,
    );

    let llm_response = gate
        .call(cancel, LlmRequest {
            stage: "response_generation".into(),
            system_prompt: SYSTEM_PROMPT.into(),
            user_prompt,
        })
        .await;

    let Ok(llm_response) = llm_response else {
        tracing::warn!(turn_id = %input.turn_id, "response generation llm call failed, falling back to template");
        return fallback(evidence);
    };

    let Some(parsed) = parse_tolerant::<RawResponse>(&llm_response.text) else {
        tracing::warn!(turn_id = %input.turn_id, "response generation output was not parseable, falling back to template");
        return fallback(evidence);
    };

    Response {
        text: parsed.text,
        sentiment: parsed.sentiment.unwrap_or(Sentiment::Neutral),
        key_insights: parsed.key_insights,
    }
}

fn fallback(evidence: &EvidenceBundle) -> Response {
    if evidence.items.is_empty() {
        return Response {
            text: "I couldn't find anything on that right now.".to_string(),
            sentiment: Sentiment::Neutral,
            key_insights: vec![],
        };
    }
    let top = &evidence.items[0];
    Response {
        text: format!(
            "Here's what I found from {}: {}",
            top.tool_id,
            summarize_payload(&top.payload)
        ),
        sentiment: Sentiment::Neutral,
        key_insights: vec![],
    }
}

fn summarize_payload(payload: &serde_json::Value) -> String {
    serde_json::to_string(payload).unwrap_or_else(|_| "no details available".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mv_domain::entities::EvidenceItem;
    use std::sync::Arc;
    use std::time::Duration;

    fn turn() -> TurnInput {
        TurnInput {
            session_id: "s1".into(),
            user_id: "u1".into(),
            turn_id: "t1".into(),
            text: "how's apple doing".into(),
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
    async fn parses_well_formed_response() {
        let canned = r#"{"text": "Apple is up today.", "sentiment": "positive", "key_insights": ["price up 2%"]}"#;
        let gate = LlmGate::new(Arc::new(CannedClient(canned.into())), Duration::from_secs(5), 8);
        let cancel = CancelToken::new();
        let response = generate(&gate, &cancel, &turn(), &[], &EvidenceBundle::default()).await;
        assert_eq!(response.text, "Apple is up today.");
        assert_eq!(response.sentiment, Sentiment::Positive);
        assert_eq!(response.key_insights, vec!["price up 2%".to_string()]);
    }

    #[tokio::test]
    async fn falls_back_to_template_on_garbage() {
        let gate = LlmGate::new(Arc::new(CannedClient("garbage".into())), Duration::from_secs(5), 8);
        let cancel = CancelToken::new();
        let mut evidence = EvidenceBundle::default();
        evidence.items.push(EvidenceItem {
            tool_id: "price_lookup".into(),
            url: None,
            relevance_score: 1.0,
            published_at: None,
            confidence: 0.9,
            payload: serde_json::json!({"quotes": []}),
            citations: vec![],
        });
        let response = generate(&gate, &cancel, &turn(), &[], &evidence).await;
        assert!(response.text.contains("price_lookup"));
    }

    #[tokio::test]
    async fn falls_back_to_generic_text_when_no_evidence() {
        let gate = LlmGate::new(Arc::new(CannedClient("garbage".into())), Duration::from_secs(5), 8);
        let cancel = CancelToken::new();
        let response = generate(&gate, &cancel, &turn(), &[], &EvidenceBundle::default()).await;
        assert!(response.text.contains("couldn't find"));
    }
}
