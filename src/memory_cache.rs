use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::cache::Cache;
use crate::types::{TargetId, TenantId};

/// In-memory cache for effective permission names.
///
/// A simple LRU cache with optional TTL, intended for tests and deployments
/// where a process-local cache is sufficient.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    inner: Arc<Mutex<CacheState>>,
    capacity: usize,
    ttl: Option<Duration>,
}

#[derive(Debug)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    order: VecDeque<CacheKey>,
}

#[derive(Debug, Clone, Hash, Eq, PartialEq)]
struct CacheKey {
    ctx: TenantId,
    target: TargetId,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    names: Vec<String>,
    updated_at: Instant,
}

impl MemoryCache {
    /// Creates a new cache with the given capacity.
    ///
    /// A capacity of zero disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheState {
                entries: HashMap::new(),
                order: VecDeque::new(),
            })),
            capacity,
            ttl: None,
        }
    }

    /// Configures a time-to-live for cache entries.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    fn key(ctx: &TenantId, target: &TargetId) -> CacheKey {
        CacheKey {
            ctx: ctx.clone(),
            target: target.clone(),
        }
    }

    fn remove_key(state: &mut CacheState, key: &CacheKey) {
        if state.entries.remove(key).is_some() {
            state.order.retain(|existing| existing != key);
        }
    }

    fn touch(state: &mut CacheState, key: &CacheKey) {
        state.order.retain(|existing| existing != key);
        state.order.push_back(key.clone());
    }

    fn is_expired(entry: &CacheEntry, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(entry.updated_at) > ttl
    }

    fn prune_expired(state: &mut CacheState, ttl: Duration, now: Instant) {
        state
            .entries
            .retain(|_, entry| !Self::is_expired(entry, ttl, now));
        state.order.retain(|key| state.entries.contains_key(key));
    }

    fn evict_if_needed(state: &mut CacheState, capacity: usize) {
        if capacity == 0 {
            state.entries.clear();
            state.order.clear();
            return;
        }

        while state.entries.len() > capacity {
            if let Some(key) = state.order.pop_front() {
                state.entries.remove(&key);
            } else {
                break;
            }
        }
    }

    fn invalidate_tenant_inner(state: &mut CacheState, ctx: &TenantId) {
        let keys: Vec<CacheKey> = state
            .entries
            .keys()
            .filter(|key| &key.ctx == ctx)
            .cloned()
            .collect();
        for key in keys {
            Self::remove_key(state, &key);
        }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get_permission_names(
        &self,
        ctx: &TenantId,
        target: &TargetId,
    ) -> Option<Vec<String>> {
        if self.capacity == 0 {
            return None;
        }

        let key = Self::key(ctx, target);
        let now = Instant::now();
        let mut guard = self.inner.lock().expect("poisoned lock");

        if let Some(ttl) = self.ttl
            && let Some(entry) = guard.entries.get(&key)
            && Self::is_expired(entry, ttl, now)
        {
            Self::remove_key(&mut guard, &key);
            return None;
        }

        let names = guard.entries.get(&key).map(|entry| entry.names.clone());
        if names.is_some() {
            Self::touch(&mut guard, &key);
        }
        names
    }

    async fn set_permission_names(&self, ctx: &TenantId, target: &TargetId, names: Vec<String>) {
        if self.capacity == 0 {
            return;
        }

        let key = Self::key(ctx, target);
        let now = Instant::now();
        let mut guard = self.inner.lock().expect("poisoned lock");

        if let Some(ttl) = self.ttl {
            Self::prune_expired(&mut guard, ttl, now);
        }

        guard.entries.insert(
            key.clone(),
            CacheEntry {
                names,
                updated_at: now,
            },
        );
        Self::touch(&mut guard, &key);
        Self::evict_if_needed(&mut guard, self.capacity);
    }

    async fn invalidate_target(&self, ctx: &TenantId, target: &TargetId) {
        let key = Self::key(ctx, target);
        let mut guard = self.inner.lock().expect("poisoned lock");
        Self::remove_key(&mut guard, &key);
    }

    async fn invalidate_tenant(&self, ctx: &TenantId) {
        let mut guard = self.inner.lock().expect("poisoned lock");
        Self::invalidate_tenant_inner(&mut guard, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn ctx() -> TenantId {
        TenantId::try_from("tenant_1").unwrap()
    }

    fn target(value: &str) -> TargetId {
        TargetId::try_from(value).unwrap()
    }

    #[test]
    fn lru_should_evict_least_recently_used() {
        let cache = MemoryCache::new(2);
        let ctx = ctx();
        let target_a = target("user_a");
        let target_b = target("user_b");
        let target_c = target("user_c");

        block_on(cache.set_permission_names(&ctx, &target_a, vec!["read".to_string()]));
        block_on(cache.set_permission_names(&ctx, &target_b, vec!["write".to_string()]));
        let _ = block_on(cache.get_permission_names(&ctx, &target_a));
        block_on(cache.set_permission_names(&ctx, &target_c, vec!["delete".to_string()]));

        assert!(block_on(cache.get_permission_names(&ctx, &target_b)).is_none());
        assert!(block_on(cache.get_permission_names(&ctx, &target_a)).is_some());
        assert!(block_on(cache.get_permission_names(&ctx, &target_c)).is_some());
    }

    #[test]
    fn ttl_should_expire_entries() {
        let cache = MemoryCache::new(1).with_ttl(Duration::from_millis(10));
        let ctx = ctx();
        let target = target("user_a");

        block_on(cache.set_permission_names(&ctx, &target, vec!["read".to_string()]));
        std::thread::sleep(Duration::from_millis(20));

        assert!(block_on(cache.get_permission_names(&ctx, &target)).is_none());
    }

    #[test]
    fn invalidate_tenant_should_clear_entries() {
        let cache = MemoryCache::new(2);
        let ctx = ctx();
        let target_a = target("user_a");
        let target_b = target("user_b");

        block_on(cache.set_permission_names(&ctx, &target_a, vec!["read".to_string()]));
        block_on(cache.set_permission_names(&ctx, &target_b, vec!["write".to_string()]));
        block_on(cache.invalidate_tenant(&ctx));

        assert!(block_on(cache.get_permission_names(&ctx, &target_a)).is_none());
        assert!(block_on(cache.get_permission_names(&ctx, &target_b)).is_none());
    }

    #[test]
    fn invalidate_target_should_leave_other_targets() {
        let cache = MemoryCache::new(2);
        let ctx = ctx();
        let target_a = target("user_a");
        let target_b = target("user_b");

        block_on(cache.set_permission_names(&ctx, &target_a, vec!["read".to_string()]));
        block_on(cache.set_permission_names(&ctx, &target_b, vec!["write".to_string()]));
        block_on(cache.invalidate_target(&ctx, &target_a));

        assert!(block_on(cache.get_permission_names(&ctx, &target_a)).is_none());
        assert!(block_on(cache.get_permission_names(&ctx, &target_b)).is_some());
    }
}
