//! Cache capability for the validated feed list.
//!
//! The pipeline only needs three operations: read a key, store a key with a
//! TTL and tags, and drop everything carrying a tag. [`MemoryCache`] is the
//! in-process implementation; expiry is measured against an injected
//! [`Clock`] so tests can step time with [`ManualClock`].

use crate::model::ValidatedFeedEntry;
use async_trait::async_trait;
use dashmap::DashMap;
use sitefeed_common::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub type FeedList = Vec<ValidatedFeedEntry>;

/// Backends report their own failures as [`SitefeedError::Cache`](sitefeed_common::SitefeedError::Cache).
#[async_trait]
pub trait FeedCache: Send + Sync {
    /// Live value under `key`; expired values are never returned.
    async fn get(&self, key: &str) -> Result<Option<FeedList>>;

    async fn set(&self, key: &str, value: FeedList, ttl: Duration, tags: &[&str]) -> Result<()>;

    /// Drop every value stored with `tag`. Returns how many were dropped.
    async fn invalidate_tag(&self, tag: &str) -> Result<usize>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
///
/// ```
/// use sitefeed_feed::cache::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// let t0 = clock.now();
/// clock.advance(Duration::from_secs(3600));
/// assert_eq!(clock.now() - t0, Duration::from_secs(3600));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset_ms: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset_ms: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, by: Duration) {
        let ms = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.offset_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
    }
}

#[derive(Debug, Clone)]
struct Slot {
    value: FeedList,
    /// `None` when `now + ttl` is past what `Instant` can represent.
    expires_at: Option<Instant>,
    tags: Vec<String>,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// Process-local cache backed by a `DashMap`.
#[derive(Clone)]
pub struct MemoryCache {
    slots: Arc<DashMap<String, Slot>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

#[async_trait]
impl FeedCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<FeedList>> {
        let now = self.clock.now();
        if let Some(slot) = self.slots.get(key) {
            if slot.is_live(now) {
                return Ok(Some(slot.value.clone()));
            }
        }
        // The read guard is released above; removing under it would deadlock the shard.
        if self.slots.remove_if(key, |_, slot| !slot.is_live(now)).is_some() {
            tracing::debug!(key, "feed.cache.expired");
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: FeedList, ttl: Duration, tags: &[&str]) -> Result<()> {
        let slot = Slot {
            value,
            expires_at: self.clock.now().checked_add(ttl),
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
        };
        self.slots.insert(key.to_string(), slot);
        Ok(())
    }

    async fn invalidate_tag(&self, tag: &str) -> Result<usize> {
        let before = self.slots.len();
        self.slots.retain(|_, slot| !slot.tags.iter().any(|t| t == tag));
        let dropped = before.saturating_sub(self.slots.len());
        tracing::debug!(tag, dropped, "feed.cache.invalidated");
        Ok(dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> (MemoryCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (MemoryCache::new(clock.clone()), clock)
    }

    #[tokio::test]
    async fn returns_value_within_ttl() {
        let (cache, clock) = cache();
        cache
            .set("github-feed", Vec::new(), Duration::from_secs(60), &["github-feed"])
            .await
            .unwrap();
        clock.advance(Duration::from_secs(59));
        assert_eq!(cache.get("github-feed").await.unwrap(), Some(Vec::new()));
    }

    #[tokio::test]
    async fn expires_at_ttl() {
        let (cache, clock) = cache();
        cache
            .set("github-feed", Vec::new(), Duration::from_secs(60), &[])
            .await
            .unwrap();
        clock.advance(Duration::from_secs(60));
        assert_eq!(cache.get("github-feed").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn invalidates_by_tag_only() {
        let (cache, _) = cache();
        let ttl = Duration::from_secs(60);
        cache.set("a", Vec::new(), ttl, &["github-feed"]).await.unwrap();
        cache.set("b", Vec::new(), ttl, &["other"]).await.unwrap();

        assert_eq!(cache.invalidate_tag("github-feed").await.unwrap(), 1);
        assert_eq!(cache.get("a").await.unwrap(), None);
        assert!(cache.get("b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unrepresentable_ttl_never_expires() {
        let (cache, clock) = cache();
        cache
            .set("github-feed", Vec::new(), Duration::MAX, &["github-feed"])
            .await
            .unwrap();
        clock.advance(Duration::from_secs(10 * 365 * 24 * 3600));
        assert_eq!(cache.get("github-feed").await.unwrap(), Some(Vec::new()));
        assert_eq!(cache.invalidate_tag("github-feed").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let (cache, _) = cache();
        assert_eq!(cache.get("nope").await.unwrap(), None);
    }
}
