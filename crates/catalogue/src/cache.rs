//! Per-group catalogue cache: TTL-bounded, LRU-evicted when the configured
//! capacity is reached.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use mcphub_domain::Tool;
use parking_lot::Mutex;

/// One cached tool list for a group, carrying its own freshness bookkeeping
/// independent of the LRU's recency order.
#[derive(Debug, Clone)]
pub struct CacheItem {
    pub value: Vec<Tool>,
    pub created_at: Instant,
    pub ttl: Duration,
    pub hits: u32,
    pub last_accessed: Instant,
}

impl CacheItem {
    fn new(value: Vec<Tool>, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            ttl,
            hits: 0,
            last_accessed: now,
        }
    }

    fn is_fresh(&self) -> bool {
        self.created_at.elapsed() < self.ttl
    }
}

const DEFAULT_CAPACITY: usize = 256;

pub struct CatalogueCache {
    entries: Mutex<LruCache<String, CacheItem>>,
    ttl: Duration,
    hits: Mutex<u64>,
    misses: Mutex<u64>,
}

impl CatalogueCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(ttl: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            hits: Mutex::new(0),
            misses: Mutex::new(0),
        }
    }

    /// Return a fresh cached value for `group_id`, recording a hit, or
    /// `None` on miss/expiry (an expired entry is evicted eagerly).
    pub fn get(&self, group_id: &str) -> Option<Vec<Tool>> {
        let mut entries = self.entries.lock();
        if let Some(item) = entries.get_mut(group_id) {
            if item.is_fresh() {
                item.hits += 1;
                item.last_accessed = Instant::now();
                *self.hits.lock() += 1;
                return Some(item.value.clone());
            }
            entries.pop(group_id);
        }
        *self.misses.lock() += 1;
        None
    }

    pub fn put(&self, group_id: impl Into<String>, tools: Vec<Tool>) {
        self.entries.lock().put(group_id.into(), CacheItem::new(tools, self.ttl));
    }

    pub fn invalidate(&self, group_id: &str) {
        self.entries.lock().pop(group_id);
    }

    pub fn invalidate_all(&self) {
        self.entries.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: *self.hits.lock(),
            misses: *self.misses.lock(),
            size: self.entries.lock().len(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcphub_domain::tool::ToolOrigin;

    fn tool(name: &str) -> Tool {
        Tool {
            name: name.to_string(),
            description: String::new(),
            input_schema: serde_json::json!({ "type": "object", "properties": {} }),
            origin: Some(ToolOrigin::Mcp { server_id: "s".into() }),
        }
    }

    #[test]
    fn miss_then_hit_after_put() {
        let cache = CatalogueCache::new(Duration::from_secs(60));
        assert!(cache.get("g1").is_none());
        cache.put("g1", vec![tool("echo")]);
        let got = cache.get("g1").unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn expired_entry_is_evicted_on_read() {
        let cache = CatalogueCache::new(Duration::from_millis(1));
        cache.put("g1", vec![tool("echo")]);
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("g1").is_none());
    }

    #[test]
    fn invalidate_removes_a_single_group() {
        let cache = CatalogueCache::new(Duration::from_secs(60));
        cache.put("g1", vec![tool("echo")]);
        cache.put("g2", vec![tool("echo")]);
        cache.invalidate("g1");
        assert!(cache.get("g1").is_none());
        assert!(cache.get("g2").is_some());
    }

    #[test]
    fn invalidate_all_clears_every_group() {
        let cache = CatalogueCache::new(Duration::from_secs(60));
        cache.put("g1", vec![tool("echo")]);
        cache.invalidate_all();
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn lru_evicts_oldest_entry_past_capacity() {
        let cache = CatalogueCache::with_capacity(Duration::from_secs(60), 1);
        cache.put("g1", vec![tool("echo")]);
        cache.put("g2", vec![tool("echo")]);
        assert!(cache.get("g1").is_none());
        assert!(cache.get("g2").is_some());
    }
}
