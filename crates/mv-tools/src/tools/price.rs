//! Price lookup (spec §4.5 #1): `{symbols[]}` → per-symbol
//! price/change/volume, cacheable 30-60 s.

use std::time::Duration;

use mv_domain::error::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::simulate::seeded_rng;
use crate::tool::{Tool, ToolOutput};

#[derive(Debug, Deserialize)]
struct PriceInput {
    symbols: Vec<String>,
}

#[derive(Debug, Serialize)]
struct PriceQuote {
    symbol: String,
    price: f64,
    change_percent: f64,
    volume: u64,
}

pub struct PriceTool {
    cache_ttl: Duration,
}

impl PriceTool {
    pub fn new(cache_ttl: Duration) -> Self {
        Self { cache_ttl }
    }
}

#[async_trait::async_trait]
impl Tool for PriceTool {
    fn id(&self) -> &str {
        "price_lookup"
    }

    fn cache_ttl(&self) -> Option<Duration> {
        Some(self.cache_ttl)
    }

    async fn call(&self, input: Value) -> Result<ToolOutput> {
        let input: PriceInput =
            serde_json::from_value(input).map_err(|e| Error::Validation(format!("price_lookup input: {e}")))?;
        if input.symbols.is_empty() {
            return Err(Error::Validation("price_lookup requires at least one symbol".into()));
        }

        let quotes: Vec<PriceQuote> = input
            .symbols
            .iter()
            .map(|symbol| {
                let mut rng = seeded_rng(symbol);
                PriceQuote {
                    symbol: symbol.to_uppercase(),
                    price: rng.gen_range(10.0..500.0),
                    change_percent: rng.gen_range(-5.0..5.0),
                    volume: rng.gen_range(100_000..50_000_000),
                }
            })
            .collect();

        let payload = serde_json::json!({ "quotes": quotes });
        Ok(ToolOutput::new(payload).with_confidence(0.95).with_relevance(1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_empty_symbol_list() {
        let tool = PriceTool::new(Duration::from_secs(45));
        let result = tool.call(serde_json::json!({ "symbols": [] })).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn same_symbol_yields_same_quote() {
        let tool = PriceTool::new(Duration::from_secs(45));
        let a = tool.call(serde_json::json!({ "symbols": ["META"] })).await.unwrap();
        let b = tool.call(serde_json::json!({ "symbols": ["META"] })).await.unwrap();
        assert_eq!(a.payload, b.payload);
    }

    #[tokio::test]
    async fn uppercases_symbols() {
        let tool = PriceTool::new(Duration::from_secs(45));
        let out = tool.call(serde_json::json!({ "symbols": ["meta"] })).await.unwrap();
        assert_eq!(out.payload["quotes"][0]["symbol"], "META");
    }
}
