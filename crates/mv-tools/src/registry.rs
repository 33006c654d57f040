//! `ToolRegistry` — the uniform call interface over heterogeneous tools
//! (spec §4.5). Wraps every registered `Tool` with a cache check, a
//! timeout, and a bounded retry on transient errors, generalized from
//! the teacher's `LlmRouter::try_chat` timeout-and-retry pattern.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use mv_domain::config::ToolsConfig;
use mv_domain::error::{Error, Result};
use mv_domain::trace::TraceEvent;
use mv_cache::KvCache;
use mv_store::retry::with_backoff;
use serde_json::Value;

use crate::tool::{Tool, ToolOutput};

/// Outcome of a single `invoke` call (spec §4.5 interface: `{output,
/// duration_ms, status, error?}`).
#[derive(Debug, Clone)]
pub struct ToolCallResult {
    pub output: Option<ToolOutput>,
    pub duration_ms: u64,
    pub status: &'static str,
    pub error: Option<String>,
}

pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    cache: Arc<KvCache>,
    config: ToolsConfig,
}

impl ToolRegistry {
    pub fn new(config: ToolsConfig, cache: Arc<KvCache>) -> Self {
        Self {
            tools: HashMap::new(),
            cache,
            config,
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.id().to_string(), tool);
    }

    pub fn contains(&self, tool_id: &str) -> bool {
        self.tools.contains_key(tool_id)
    }

    /// Invoke a registered tool by id. Cache-hits skip the timeout/retry
    /// wrapper entirely; cache-misses run the tool, retrying only
    /// transient failures (validation errors are never retried, spec
    /// §4.5).
    pub async fn invoke(&self, tool_id: &str, input: Value) -> ToolCallResult {
        let start = Instant::now();
        let Some(tool) = self.tools.get(tool_id) else {
            return ToolCallResult {
                output: None,
                duration_ms: start.elapsed().as_millis() as u64,
                status: "error",
                error: Some(format!("unknown tool '{tool_id}'")),
            };
        };

        let cache_key = tool.cache_ttl().map(|_| cache_key(tool_id, &input));
        if let Some(key) = &cache_key {
            if let Some(cached) = self.cache.get(key) {
                TraceEvent::ToolInvoked {
                    tool_id: tool_id.to_string(),
                    status: "ok".into(),
                    duration_ms: start.elapsed().as_millis() as u64,
                }
                .emit();
                return ToolCallResult {
                    output: Some(ToolOutput::new(cached)),
                    duration_ms: start.elapsed().as_millis() as u64,
                    status: "ok",
                    error: None,
                };
            }
        }

        let timeout = tool.timeout().unwrap_or(Duration::from_millis(self.config.default_timeout_ms));
        let ttl_for_cache = tool.cache_ttl();
        let tool = tool.clone();
        let input_for_retry = input.clone();
        let result: Result<ToolOutput> = with_backoff(self.config.max_retries, Duration::from_millis(100), move || {
            let tool = tool.clone();
            let input = input_for_retry.clone();
            async move {
                match tokio::time::timeout(timeout, tool.call(input)).await {
                    Ok(inner) => inner,
                    Err(_) => Err(Error::Timeout(format!("tool '{}' timed out after {:?}", tool.id(), timeout))),
                }
            }
        })
        .await;

        let duration_ms = start.elapsed().as_millis() as u64;
        let status = if result.is_ok() { "ok" } else { "error" };
        TraceEvent::ToolInvoked {
            tool_id: tool_id.to_string(),
            status: status.to_string(),
            duration_ms,
        }
        .emit();

        match result {
            Ok(output) => {
                if let Some(key) = &cache_key {
                    self.cache.set_with_ttl(key.clone(), output.payload.clone(), ttl_for_cache);
                }
                ToolCallResult {
                    output: Some(output),
                    duration_ms,
                    status: "ok",
                    error: None,
                }
            }
            Err(e) => ToolCallResult {
                output: None,
                duration_ms,
                status: "error",
                error: Some(e.to_string()),
            },
        }
    }
}

fn cache_key(tool_id: &str, input: &Value) -> String {
    format!("{tool_id}:{}", serde_json::to_string(input).unwrap_or_default())
}

/// Build a registry with all five canonical tools wired to their config
/// sections and a shared store handle (spec §4.5 "Canonical tools").
pub fn build_default(config: ToolsConfig, cache: Arc<KvCache>, store: Arc<mv_store::Store>) -> ToolRegistry {
    let price_ttl = Duration::from_secs(config.price.cache_ttl_secs);
    let news_ttl = Duration::from_secs(config.news.cache_ttl_secs);
    let research_ttl = Duration::from_secs(config.research.cache_ttl_secs);
    let preferences_ttl = Duration::from_secs(config.preferences.cache_ttl_secs);

    let mut registry = ToolRegistry::new(config, cache);
    registry.register(Arc::new(crate::tools::PriceTool::new(price_ttl)));
    registry.register(Arc::new(crate::tools::NewsTool::new(news_ttl)));
    registry.register(Arc::new(crate::tools::ResearchTool::new(research_ttl)));
    registry.register(Arc::new(crate::tools::WatchlistTool::new(store.clone())));
    registry.register(Arc::new(crate::tools::PreferencesTool::new(store, preferences_ttl)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct EchoTool {
        cache_ttl: Option<Duration>,
        calls: std::sync::atomic::AtomicU32,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn id(&self) -> &str {
            "echo"
        }
        fn cache_ttl(&self) -> Option<Duration> {
            self.cache_ttl
        }
        async fn call(&self, input: Value) -> Result<ToolOutput> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(ToolOutput::new(input))
        }
    }

    struct AlwaysValidationError;

    #[async_trait]
    impl Tool for AlwaysValidationError {
        fn id(&self) -> &str {
            "bad"
        }
        async fn call(&self, _input: Value) -> Result<ToolOutput> {
            Err(Error::Validation("nope".into()))
        }
    }

    fn registry_with(tool: Arc<dyn Tool>) -> ToolRegistry {
        let mut r = ToolRegistry::new(ToolsConfig::default(), Arc::new(KvCache::new()));
        r.register(tool);
        r
    }

    #[tokio::test]
    async fn unknown_tool_returns_error_result() {
        let registry = registry_with(Arc::new(EchoTool {
            cache_ttl: None,
            calls: Default::default(),
        }));
        let result = registry.invoke("nope", serde_json::json!({})).await;
        assert_eq!(result.status, "error");
    }

    #[tokio::test]
    async fn cache_hit_skips_second_call() {
        let tool = Arc::new(EchoTool {
            cache_ttl: Some(Duration::from_secs(60)),
            calls: Default::default(),
        });
        let registry = registry_with(tool.clone());
        let input = serde_json::json!({"symbols": ["META"]});
        registry.invoke("echo", input.clone()).await;
        registry.invoke("echo", input).await;
        assert_eq!(tool.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn validation_error_is_not_retried() {
        let registry = registry_with(Arc::new(AlwaysValidationError));
        let result = registry.invoke("bad", serde_json::json!({})).await;
        assert_eq!(result.status, "error");
        assert!(result.error.unwrap().contains("nope"));
    }
}
