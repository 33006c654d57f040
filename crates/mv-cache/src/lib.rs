//! Best-effort key/value store with per-key TTL (spec §2 "KV Cache").
//!
//! Never used for correctness-critical state — a miss is just a slower
//! path, never an error. Expiry is checked lazily on read; there is no
//! background sweep thread, matching the "best-effort" framing in spec
//! §3 ("Shared-resource policy").

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

struct Entry {
    value: serde_json::Value,
    expires_at: Option<Instant>,
}

/// In-memory TTL cache. Cloneable handles share the same backing map via
/// `Arc` at the call site (the cache itself holds no `Arc` — callers wrap
/// it, matching how `mv-tools` shares one `KvCache` across tool
/// instances).
pub struct KvCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl Default for KvCache {
    fn default() -> Self {
        Self::new()
    }
}

impl KvCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Store `value` under `key`. `ttl = None` caches forever; `ttl =
    /// Some(Duration::ZERO)` is accepted but the entry expires
    /// immediately — callers wanting "never cache" should not call
    /// `set_with_ttl` at all (spec §4.5: a tool's cache TTL of `0` means
    /// "never cache", which is enforced by the tool wrapper skipping the
    /// cache entirely, not by this method).
    pub fn set_with_ttl(&self, key: impl Into<String>, value: serde_json::Value, ttl: Option<Duration>) {
        let expires_at = ttl.map(|d| Instant::now() + d);
        self.entries.lock().insert(key.into(), Entry { value, expires_at });
    }

    /// Look up `key`. Returns `None` on a miss or an expired entry,
    /// pruning the expired entry as a side effect.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let mut entries = self.entries.lock();
        let entry = entries.get(key)?;
        if let Some(expires_at) = entry.expires_at {
            if Instant::now() >= expires_at {
                entries.remove(key);
                return None;
            }
        }
        Some(entries.get(key).unwrap().value.clone())
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_hits() {
        let cache = KvCache::new();
        cache.set_with_ttl("k", serde_json::json!({"v": 1}), None);
        assert_eq!(cache.get("k"), Some(serde_json::json!({"v": 1})));
    }

    #[test]
    fn miss_returns_none() {
        let cache = KvCache::new();
        assert_eq!(cache.get("nope"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn entry_expires_after_ttl() {
        let cache = KvCache::new();
        cache.set_with_ttl("k", serde_json::json!(1), Some(Duration::from_millis(10)));
        assert!(cache.get("k").is_some());
        tokio::time::advance(Duration::from_millis(20)).await;
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = KvCache::new();
        cache.set_with_ttl("k", serde_json::json!(1), None);
        cache.invalidate("k");
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn forever_entry_never_expires_on_read() {
        let cache = KvCache::new();
        cache.set_with_ttl("k", serde_json::json!(1), None);
        assert!(cache.get("k").is_some());
    }
}
