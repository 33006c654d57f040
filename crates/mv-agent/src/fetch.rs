//! Stages 3+4 — parallel fetch and checklist join (spec §4.3 "Fetch" /
//! "Join checklist"). Two independently-deadlined dispatch groups:
//! direct tool calls driven straight off non-checklist intents (bounded
//! by `TURN_TOOL_DEADLINE`), and checklist-item research calls that
//! stage 4 actually joins on (bounded by the longer
//! `CHECKLIST_JOIN_DEADLINE`). Generalizes the teacher's
//! `gateway::runtime::turn` parallel tool dispatch, which races a fan-out
//! group of borrowed futures against one deadline.

use std::time::Duration;

use chrono::Utc;
use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use mv_domain::cancel::CancelToken;
use mv_domain::config::DeadlinesConfig;
use mv_domain::entities::{ChecklistItem, EvidenceBundle, EvidenceItem, Intent, IntentTag};
use mv_tools::ToolRegistry;

pub struct FetchOutcome {
    pub evidence: EvidenceBundle,
    pub checklist: Vec<ChecklistItem>,
}

/// Run the direct tool calls and the checklist join concurrently, each
/// under its own deadline, merging the resulting evidence into one
/// bundle (spec §4.3 "Tie-breaks & numeric semantics": evidence is
/// ranked and deduped once all fetch work settles or times out).
pub async fn run(
    registry: &ToolRegistry,
    cancel: &CancelToken,
    deadlines: &DeadlinesConfig,
    user_id: &str,
    intents: &[Intent],
    mut checklist: Vec<ChecklistItem>,
) -> FetchOutcome {
    let (direct_evidence, joined_checklist) = tokio::join!(
        run_direct(registry, cancel, deadlines.turn_tool_deadline(), user_id, intents),
        run_checklist_join(registry, cancel, deadlines.checklist_join_deadline(), &mut checklist),
    );

    let mut evidence = direct_evidence;
    for item in joined_checklist {
        evidence.push_deduped(item);
    }
    evidence.rank();

    FetchOutcome { evidence, checklist }
}

async fn run_direct(
    registry: &ToolRegistry,
    cancel: &CancelToken,
    deadline: Duration,
    user_id: &str,
    intents: &[Intent],
) -> EvidenceBundle {
    let mut bundle = EvidenceBundle::default();
    let mut pending: FuturesUnordered<_> = intents
        .iter()
        .filter_map(|intent| direct_call(user_id, intent))
        .map(|(tool_id, input)| registry_invoke(registry, tool_id, input))
        .collect();

    if pending.is_empty() {
        return bundle;
    }

    let deadline_fut = tokio::time::sleep(deadline);
    tokio::pin!(deadline_fut);
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                bundle.partial = true;
                break;
            }
            _ = &mut deadline_fut => {
                bundle.partial = true;
                break;
            }
            next = pending.next() => {
                match next {
                    Some(Some(item)) => bundle.push_deduped(item),
                    Some(None) => bundle.partial = true,
                    None => break,
                }
            }
        }
    }

    bundle
}

/// Join on the checklist, marking each item completed as its research
/// call resolves (spec §3 "Checklist Item": `completed`, `result_count`,
/// `completed_at`). Items still incomplete when the deadline fires stay
/// `completed = false` and the bundle is marked partial.
async fn run_checklist_join(
    registry: &ToolRegistry,
    cancel: &CancelToken,
    deadline: Duration,
    checklist: &mut [ChecklistItem],
) -> Vec<EvidenceItem> {
    let mut collected = Vec::new();
    if checklist.is_empty() {
        return collected;
    }

    let mut pending: FuturesUnordered<_> = checklist
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let input = serde_json::json!({
                "query": item.query,
                "checklist_queries": [item.query],
                "min_results": item.min_result_requirement,
            });
            registry_invoke_research(registry, idx, input)
        })
        .collect();

    let deadline_fut = tokio::time::sleep(deadline);
    tokio::pin!(deadline_fut);
    let mut remaining = checklist.len();
    while remaining > 0 {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = &mut deadline_fut => break,
            next = pending.next() => {
                match next {
                    Some((idx, Some((item, result_count)))) => {
                        checklist[idx].completed = true;
                        checklist[idx].result_count = result_count;
                        checklist[idx].completed_at = Some(Utc::now());
                        collected.push(item);
                        remaining -= 1;
                    }
                    Some((_, None)) => {
                        remaining -= 1;
                    }
                    None => break,
                }
            }
        }
    }

    collected
}

fn direct_call(user_id: &str, intent: &Intent) -> Option<(&'static str, serde_json::Value)> {
    match intent.tag {
        IntentTag::PriceCheck if !intent.symbols.is_empty() => {
            Some(("price_lookup", serde_json::json!({ "symbols": intent.symbols })))
        }
        IntentTag::NewsSearch => Some((
            "news_lookup",
            serde_json::json!({ "symbols": intent.symbols, "topics": intent.keywords }),
        )),
        IntentTag::Watchlist => Some((
            "watchlist",
            serde_json::json!({
                "user_id": user_id,
                "action": intent.watchlist_action.unwrap_or(mv_domain::entities::WatchlistAction::View),
                "symbols": intent.symbols,
            }),
        )),
        _ => None,
    }
}

async fn registry_invoke(registry: &ToolRegistry, tool_id: &'static str, input: serde_json::Value) -> Option<EvidenceItem> {
    let result = registry.invoke(tool_id, input).await;
    let output = result.output?;
    Some(EvidenceItem {
        tool_id: tool_id.to_string(),
        url: output.sources.first().cloned(),
        relevance_score: output.relevance_score,
        published_at: None,
        confidence: output.confidence,
        payload: output.payload,
        citations: output.sources,
    })
}

async fn registry_invoke_research(registry: &ToolRegistry, idx: usize, input: serde_json::Value) -> (usize, Option<(EvidenceItem, usize)>) {
    let result = registry.invoke("general_research", input).await;
    let Some(output) = result.output else {
        return (idx, None);
    };
    let result_count = output.payload.get("results").and_then(|v| v.as_array()).map(|a| a.len()).unwrap_or(0);
    let item = EvidenceItem {
        tool_id: "general_research".to_string(),
        url: output.sources.first().cloned(),
        relevance_score: output.relevance_score,
        published_at: None,
        confidence: output.confidence,
        payload: output.payload,
        citations: output.sources,
    };
    (idx, Some((item, result_count)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mv_cache::KvCache;
    use mv_domain::config::ToolsConfig;
    use mv_domain::entities::WatchlistAction;
    use mv_store::Store;
    use std::sync::Arc;

    fn registry() -> ToolRegistry {
        mv_tools::registry::build_default(ToolsConfig::default(), Arc::new(KvCache::new()), Arc::new(Store::in_memory()))
    }

    fn price_intent(symbol: &str) -> Intent {
        Intent {
            tag: IntentTag::PriceCheck,
            symbols: vec![symbol.to_string()],
            keywords: vec![],
            watchlist_action: None,
        }
    }

    #[tokio::test]
    async fn price_check_produces_evidence() {
        let registry = registry();
        let cancel = CancelToken::new();
        let deadlines = DeadlinesConfig::default();
        let outcome = run(&registry, &cancel, &deadlines, "u1", &[price_intent("AAPL")], vec![]).await;
        assert_eq!(outcome.evidence.items.len(), 1);
        assert_eq!(outcome.evidence.items[0].tool_id, "price_lookup");
    }

    #[tokio::test]
    async fn checklist_items_are_marked_completed_after_join() {
        let registry = registry();
        let cancel = CancelToken::new();
        let deadlines = DeadlinesConfig::default();
        let checklist = vec![mv_domain::entities::ChecklistItem::new("t1", 0, "AAPL outlook", vec!["AAPL".into()], vec![])];
        let intents = vec![Intent {
            tag: IntentTag::Research,
            symbols: vec!["AAPL".into()],
            keywords: vec![],
            watchlist_action: None,
        }];
        let outcome = run(&registry, &cancel, &deadlines, "u1", &intents, checklist).await;
        assert!(outcome.checklist[0].completed);
        assert!(outcome.checklist[0].result_count > 0);
    }

    #[tokio::test]
    async fn watchlist_view_does_not_require_symbols() {
        let registry = registry();
        let cancel = CancelToken::new();
        let deadlines = DeadlinesConfig::default();
        let intent = Intent {
            tag: IntentTag::Watchlist,
            symbols: vec![],
            keywords: vec![],
            watchlist_action: Some(WatchlistAction::View),
        };
        let outcome = run(&registry, &cancel, &deadlines, "u1", &[intent], vec![]).await;
        assert_eq!(outcome.evidence.items.len(), 1);
        assert_eq!(outcome.evidence.items[0].tool_id, "watchlist");
    }
}
