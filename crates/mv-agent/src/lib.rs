//! The staged agent pipeline (spec §4.3): intent analysis, checklist
//! construction, parallel tool fetch, response generation, memory
//! tracking, and speech emission, wired together by `AgentGraph`.

pub mod checklist;
pub mod fetch;
pub mod graph;
pub mod intent;
pub mod respond;
pub mod speech;
pub mod ticker_map;
pub mod types;

pub use graph::AgentGraph;
pub use types::{RecentTurn, SpeechChunk, TurnInput, TurnOutput};
