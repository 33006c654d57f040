//! Stage 2 — checklist construction (spec §4.3 "Build checklist").
//! `research` and `comparison` intents get one checklist item per symbol
//! × keyword group so stage 4 can join on completion; every other intent
//! that still needs a tool call gets a single lookup item, and pure
//! `chat`/`unknown` intents get none.

use mv_domain::entities::{ChecklistItem, Intent, IntentTag};

/// Build the checklist for a turn's intents (spec §3 "Checklist Item").
pub fn build(turn_id: &str, intents: &[Intent]) -> Vec<ChecklistItem> {
    let mut items = Vec::new();
    let mut index = 0;

    for intent in intents {
        if intent.tag.needs_checklist() {
            items.extend(checklist_items_for(turn_id, &mut index, intent));
        } else if needs_single_lookup(intent.tag) {
            items.push(single_lookup_item(turn_id, index, intent));
            index += 1;
        }
    }

    items
}

fn needs_single_lookup(tag: IntentTag) -> bool {
    matches!(tag, IntentTag::PriceCheck | IntentTag::NewsSearch | IntentTag::Watchlist)
}

fn checklist_items_for(turn_id: &str, index: &mut usize, intent: &Intent) -> Vec<ChecklistItem> {
    let symbols = if intent.symbols.is_empty() {
        vec![String::new()]
    } else {
        intent.symbols.clone()
    };
    let keyword_groups = if intent.keywords.is_empty() {
        vec![Vec::new()]
    } else {
        intent.keywords.iter().map(|k| vec![k.clone()]).collect()
    };

    let mut items = Vec::new();
    for symbol in &symbols {
        for keywords in &keyword_groups {
            let query = build_query(symbol, keywords);
            let target_symbols = if symbol.is_empty() { vec![] } else { vec![symbol.clone()] };
            items.push(ChecklistItem::new(turn_id, *index, query, target_symbols, keywords.clone()));
            *index += 1;
        }
    }
    items
}

fn single_lookup_item(turn_id: &str, index: usize, intent: &Intent) -> ChecklistItem {
    let query = build_query(intent.symbols.first().map(String::as_str).unwrap_or(""), &intent.keywords);
    ChecklistItem::new(turn_id, index, query, intent.symbols.clone(), intent.keywords.clone())
}

fn build_query(symbol: &str, keywords: &[String]) -> String {
    match (symbol.is_empty(), keywords.is_empty()) {
        (true, true) => "general".to_string(),
        (false, true) => symbol.to_string(),
        (true, false) => keywords.join(" "),
        (false, false) => format!("{symbol} {}", keywords.join(" ")),
    }
}
