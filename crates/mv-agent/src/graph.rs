//! The agent graph (spec §4.3): the seven-stage pipeline wired end to
//! end — analyze intent, build checklist, fetch (parallel tool calls +
//! checklist join), generate response, track memory, speak. Bounded
//! overall by `TURN_DEADLINE` and cancellable at every `await` point via
//! `CancelToken`, generalizing the teacher's `gateway::runtime::turn::run_turn`
//! orchestrator.

use std::sync::Arc;
use std::time::Instant;

use mv_domain::cancel::CancelToken;
use mv_domain::config::DeadlinesConfig;
use mv_llm::LlmGate;
use mv_memory::{MemoryManager, TrackedTurn};
use mv_tools::ToolRegistry;

use crate::{checklist, fetch, intent, respond, speech};
use crate::types::{TurnInput, TurnOutput};

pub struct AgentGraph {
    llm_gate: Arc<LlmGate>,
    tools: Arc<ToolRegistry>,
    memory: Arc<MemoryManager>,
    deadlines: DeadlinesConfig,
}

impl AgentGraph {
    pub fn new(llm_gate: Arc<LlmGate>, tools: Arc<ToolRegistry>, memory: Arc<MemoryManager>, deadlines: DeadlinesConfig) -> Self {
        Self { llm_gate, tools, memory, deadlines }
    }

    /// Run a single turn through every stage. Returns `None` if the
    /// turn deadline elapsed or `cancel` fired before a response was
    /// produced (spec §9 "cancellation aborts with no response") — the
    /// caller must not emit a frame in that case.
    pub async fn run_turn(&self, cancel: &CancelToken, input: TurnInput) -> Option<TurnOutput> {
        let start = Instant::now();
        let turn_cancel = cancel.child();

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = tokio::time::timeout(self.deadlines.turn_deadline(), self.run_stages(&turn_cancel, &input)) => {
                result.ok()
            }
        };

        outcome.map(|mut output| {
            output.processing_time_ms = start.elapsed().as_millis() as u64;
            output
        })
    }

    async fn run_stages(&self, cancel: &CancelToken, input: &TurnInput) -> TurnOutput {
        let intents = intent::analyze(&self.llm_gate, cancel, input).await;

        let checklist_items = checklist::build(&input.turn_id, &intents);

        let fetch::FetchOutcome { evidence, checklist } =
            fetch::run(&self.tools, cancel, &self.deadlines, &input.user_id, &intents, checklist_items).await;

        let response = respond::generate(&self.llm_gate, cancel, input, &intents, &evidence).await;

        self.track_memory(input, &intents, &response.text);

        let speech_chunks = speech::emit(&response.text, input.audio_requested);

        TurnOutput {
            response_text: response.text,
            sentiment: response.sentiment,
            key_insights: response.key_insights,
            symbols: intents.iter().flat_map(|i| i.symbols.clone()).collect(),
            watchlist_snapshot: watchlist_snapshot(&evidence),
            processing_time_ms: 0,
            partial: evidence.partial || checklist.iter().any(|c| !c.completed),
            evidence,
            speech_chunks,
            intents,
        }
    }

    /// Stage 6 (spec §4.3 "Track memory"). In-process only — no
    /// persistent write happens here (invariant I6); the buffered turns
    /// are flushed by `MemoryManager::finalize` at session close.
    fn track_memory(&self, input: &TurnInput, intents: &[mv_domain::entities::Intent], response_text: &str) {
        let Some(primary) = intents.first() else {
            return;
        };
        let short_summary: String = response_text.chars().take(160).collect();
        self.memory.track(&input.session_id, TrackedTurn {
            query: input.text.clone(),
            intent: primary.tag,
            symbols: primary.symbols.clone(),
            short_summary,
        });
    }
}

fn watchlist_snapshot(evidence: &mv_domain::entities::EvidenceBundle) -> Option<Vec<String>> {
    evidence
        .items
        .iter()
        .find(|item| item.tool_id == "watchlist")
        .and_then(|item| item.payload.get("symbols"))
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|s| s.as_str().map(String::from)).collect())
}
