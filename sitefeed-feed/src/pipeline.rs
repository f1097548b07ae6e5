//! Cache-fronted feed ingestion.
//!
//! A call to [`FeedPipeline::fetch_feed_list`] first consults the cache. On a
//! miss it walks the upstream pages in order, transforms every entry and
//! stores the result for the configured TTL. Concurrent misses are coalesced:
//! one caller recomputes while the others wait and then read the cache.

use crate::cache::{FeedCache, FeedList, MemoryCache};
use crate::model::FeedEntry;
use crate::source::{FeedSource, GithubFeedSource};
use crate::transform::EntryTransformer;
use crate::{FeedError, atom};
use sitefeed_common::Result;
use sitefeed_config::FeedSettings;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct FeedPipeline {
    source: Arc<dyn FeedSource>,
    cache: Arc<dyn FeedCache>,
    transformer: EntryTransformer,
    settings: FeedSettings,
    refresh: Mutex<()>,
}

impl FeedPipeline {
    pub fn new(
        source: Arc<dyn FeedSource>,
        cache: Arc<dyn FeedCache>,
        settings: FeedSettings,
    ) -> Self {
        Self {
            source,
            cache,
            transformer: EntryTransformer::from_settings(&settings),
            settings,
            refresh: Mutex::new(()),
        }
    }

    /// GitHub source with an in-process cache.
    pub fn github(settings: FeedSettings) -> std::result::Result<Self, FeedError> {
        let source = GithubFeedSource::new(&settings)?;
        Ok(Self::new(
            Arc::new(source),
            Arc::new(MemoryCache::default()),
            settings,
        ))
    }

    pub fn settings(&self) -> &FeedSettings {
        &self.settings
    }

    /// Validated entries, oldest page last. Never fails: any error that escapes
    /// the per-page and per-entry recovery yields an empty list.
    pub async fn fetch_feed_list(&self) -> FeedList {
        match self.try_fetch_feed_list().await {
            Ok(entries) => entries,
            Err(err) => {
                tracing::error!(error = %err, "feed.pipeline.failed");
                Vec::new()
            }
        }
    }

    /// Like [`fetch_feed_list`](Self::fetch_feed_list) but surfaces cache failures.
    pub async fn try_fetch_feed_list(&self) -> Result<FeedList> {
        let key = self.settings.cache_key.as_str();
        if let Some(hit) = self.cache.get(key).await? {
            tracing::debug!(key, entries = hit.len(), "feed.cache.hit");
            return Ok(hit);
        }

        let _guard = self.refresh.lock().await;
        // Another caller may have refreshed while we waited.
        if let Some(hit) = self.cache.get(key).await? {
            tracing::debug!(key, entries = hit.len(), "feed.cache.hit_after_wait");
            return Ok(hit);
        }

        tracing::debug!(key, "feed.cache.miss");
        let raw = self.fetch_pages().await;
        let fetched = raw.len();
        let entries = self.transformer.transform_all(raw);
        tracing::info!(fetched, kept = entries.len(), "feed.pipeline.refreshed");

        let tag = self.settings.cache_tag.as_str();
        self.cache
            .set(key, entries.clone(), self.settings.cache_ttl(), &[tag])
            .await?;
        Ok(entries)
    }

    /// Drop the cached list so the next call refetches.
    pub async fn invalidate(&self) -> Result<usize> {
        self.cache.invalidate_tag(&self.settings.cache_tag).await
    }

    async fn fetch_pages(&self) -> Vec<FeedEntry> {
        let delay = self.settings.page_delay();
        let min_entries = self.settings.min_entries_per_page;
        let mut all = Vec::new();
        // Pacing only follows a page that actually reached upstream and parsed.
        let mut pause = false;

        for page in 1..=self.settings.max_pages {
            if pause && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let entries = match self.fetch_page(page).await {
                Ok(entries) => {
                    pause = true;
                    entries
                }
                Err(err) => {
                    tracing::warn!(page, error = %err, "feed.page.fetch_failed");
                    pause = false;
                    continue;
                }
            };

            let count = entries.len();
            all.extend(entries);
            if count == 0 {
                tracing::debug!(page, "feed.page.empty");
                break;
            }
            if count < min_entries {
                tracing::debug!(page, count, min_entries, "feed.page.last");
                break;
            }
        }

        all
    }

    async fn fetch_page(&self, page: u32) -> std::result::Result<Vec<FeedEntry>, FeedError> {
        let xml = self.source.fetch_page(page).await?;
        atom::parse_page(&xml)
    }
}
