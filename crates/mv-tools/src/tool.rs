//! The uniform capability interface every tool implements (spec §4.5).
//!
//! Shape mirrors the teacher's provider trait: a name, a declared
//! timeout/cache policy, and a single async entry point returning a
//! normalized envelope rather than a raw payload.

use std::time::Duration;

use mv_domain::error::Result;
use serde_json::Value;

/// Normalized output envelope (spec §4.5 "Outputs"). `payload` is the
/// tool-specific raw result; the remaining fields are what the agent
/// graph's evidence ranking/confidence math operates on.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub payload: Value,
    pub relevance_score: f64,
    pub sources: Vec<String>,
    pub confidence: f64,
}

impl ToolOutput {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            relevance_score: 1.0,
            sources: Vec::new(),
            confidence: 1.0,
        }
    }

    pub fn with_relevance(mut self, score: f64) -> Self {
        self.relevance_score = score;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }
}

/// A single registered capability. Implementors validate `input` before
/// doing any work — malformed input is `Error::Validation`, which the
/// registry never retries (spec §4.5).
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn id(&self) -> &str;

    /// Per-tool timeout; falls back to the registry default when `None`.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Cache TTL for successful calls; `None` means never cache (spec
    /// §4.5 "Cacheability", `0` in the spec's prose).
    fn cache_ttl(&self) -> Option<Duration> {
        None
    }

    async fn call(&self, input: Value) -> Result<ToolOutput>;
}
