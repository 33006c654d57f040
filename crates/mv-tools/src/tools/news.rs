//! News lookup (spec §4.5 #2): `{symbols[]?, topics[]?, limit}` → list
//! of articles with source, publish time, sentiment; cacheable 5-15 min.

use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use mv_domain::error::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::simulate::seeded_rng;
use crate::tool::{Tool, ToolOutput};

#[derive(Debug, Deserialize)]
struct NewsInput {
    #[serde(default)]
    symbols: Vec<String>,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    5
}

#[derive(Debug, Serialize)]
struct Article {
    title: String,
    source: String,
    url: String,
    published_at: chrono::DateTime<Utc>,
    sentiment: f64,
}

const SOURCES: [&str; 4] = ["MarketWire", "Ticker Daily", "StreetPulse", "Quarterly Beat"];

pub struct NewsTool {
    cache_ttl: Duration,
}

impl NewsTool {
    pub fn new(cache_ttl: Duration) -> Self {
        Self { cache_ttl }
    }
}

#[async_trait::async_trait]
impl Tool for NewsTool {
    fn id(&self) -> &str {
        "news_lookup"
    }

    fn cache_ttl(&self) -> Option<Duration> {
        Some(self.cache_ttl)
    }

    async fn call(&self, input: Value) -> Result<ToolOutput> {
        let input: NewsInput =
            serde_json::from_value(input).map_err(|e| Error::Validation(format!("news_lookup input: {e}")))?;
        if input.symbols.is_empty() && input.topics.is_empty() {
            return Err(Error::Validation("news_lookup requires at least one symbol or topic".into()));
        }

        let subjects: Vec<String> = input.symbols.iter().chain(input.topics.iter()).cloned().collect();
        let mut articles = Vec::new();
        for subject in &subjects {
            for i in 0..input.limit.min(10) {
                let seed = format!("{subject}-{i}");
                let mut rng = seeded_rng(&seed);
                articles.push(Article {
                    title: format!("{subject} moves on {} update", SOURCES[i % SOURCES.len()]),
                    source: SOURCES[rng.gen_range(0..SOURCES.len())].to_string(),
                    url: format!("https://news.example/{}/{i}", subject.to_lowercase()),
                    published_at: Utc::now() - ChronoDuration::minutes(rng.gen_range(1..720)),
                    sentiment: rng.gen_range(-1.0..1.0),
                });
            }
        }
        articles.truncate(input.limit.max(1));

        let sources = articles.iter().map(|a| a.url.clone()).collect();
        let payload = serde_json::json!({ "articles": articles });
        Ok(ToolOutput::new(payload)
            .with_confidence(0.8)
            .with_relevance(0.85)
            .with_sources(sources))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_no_subject() {
        let tool = NewsTool::new(Duration::from_secs(600));
        let result = tool.call(serde_json::json!({})).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn respects_limit() {
        let tool = NewsTool::new(Duration::from_secs(600));
        let out = tool
            .call(serde_json::json!({ "symbols": ["META"], "limit": 2 }))
            .await
            .unwrap();
        assert_eq!(out.payload["articles"].as_array().unwrap().len(), 2);
    }
}
