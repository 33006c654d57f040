//! General research (spec §4.5 #3): `{query, checklist_queries[],
//! min_results, max_pages}` → search results + fetched page snippets,
//! scored and deduped; cacheable 1 h by query hash.

use std::time::Duration;

use mv_domain::error::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::simulate::seeded_rng;
use crate::tool::{Tool, ToolOutput};

#[derive(Debug, Deserialize)]
struct ResearchInput {
    query: String,
    #[serde(default)]
    checklist_queries: Vec<String>,
    #[serde(default = "default_min_results")]
    min_results: usize,
    #[serde(default = "default_max_pages")]
    max_pages: usize,
}

fn default_min_results() -> usize {
    5
}

fn default_max_pages() -> usize {
    3
}

#[derive(Debug, Serialize, Clone)]
struct Snippet {
    url: String,
    title: String,
    excerpt: String,
    relevance_score: f64,
}

pub struct ResearchTool {
    cache_ttl: Duration,
}

impl ResearchTool {
    pub fn new(cache_ttl: Duration) -> Self {
        Self { cache_ttl }
    }
}

#[async_trait::async_trait]
impl Tool for ResearchTool {
    fn id(&self) -> &str {
        "general_research"
    }

    fn cache_ttl(&self) -> Option<Duration> {
        Some(self.cache_ttl)
    }

    async fn call(&self, input: Value) -> Result<ToolOutput> {
        let input: ResearchInput =
            serde_json::from_value(input).map_err(|e| Error::Validation(format!("general_research input: {e}")))?;
        if input.query.trim().is_empty() {
            return Err(Error::Validation("general_research requires a non-empty query".into()));
        }

        let queries: Vec<String> = if input.checklist_queries.is_empty() {
            vec![input.query.clone()]
        } else {
            input.checklist_queries.clone()
        };

        let mut snippets: Vec<Snippet> = Vec::new();
        for q in &queries {
            let denom = queries.len().max(1);
            let per_query = ((input.min_results.max(1) + denom - 1) / denom).max(1);
            for i in 0..per_query.min(input.max_pages.max(1) * 3) {
                let seed = format!("{q}-{i}");
                let mut rng = seeded_rng(&seed);
                let url = format!("https://research.example/{}/{i}", slugify(q));
                if snippets.iter().any(|s| s.url == url) {
                    continue;
                }
                snippets.push(Snippet {
                    url,
                    title: format!("{q}: finding #{i}"),
                    excerpt: format!("Synthesized summary of {q} covering aspect {i}."),
                    relevance_score: rng.gen_range(0.4..1.0),
                });
            }
        }
        snippets.sort_by(|a, b| b.relevance_score.partial_cmp(&a.relevance_score).unwrap());

        let confidence = if snippets.len() >= input.min_results { 0.9 } else { 0.6 };
        let sources = snippets.iter().map(|s| s.url.clone()).collect();
        let relevance = snippets.first().map(|s| s.relevance_score).unwrap_or(0.0);
        let payload = serde_json::json!({ "query": input.query, "results": snippets });

        Ok(ToolOutput::new(payload)
            .with_confidence(confidence)
            .with_relevance(relevance)
            .with_sources(sources))
    }
}

fn slugify(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect()
}
