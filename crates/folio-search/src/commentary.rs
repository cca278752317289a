//! Commentary index: page number to plain commentary text.
//!
//! The index is built at most once. [`CommentaryIndexBuilder::trigger`] moves it
//! from [`IndexState::Empty`] to [`IndexState::Building`] and spawns a task that
//! fetches every page fragment concurrently. Entries become visible as their
//! fetch settles; once every fetch has settled the state flips to
//! [`IndexState::Ready`] and subscribers are woken.

use std::{collections::BTreeMap, sync::Arc, time::Instant};

use folio_core::{PageLocator, PageTable};
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::{RwLock, RwLockReadGuard};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::{Result, SearchError, extract::CommentaryExtractor, fragment::FragmentSource};

/// Lifecycle of the commentary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexState {
    /// Nothing requested yet.
    Empty,
    /// Fetches are in flight; entries may be partial.
    Building,
    /// Every fetch has settled; the index is immutable.
    Ready,
}

/// Shared commentary text keyed by page number.
#[derive(Debug)]
pub struct CommentaryIndex {
    entries: RwLock<BTreeMap<u32, String>>,
    state: watch::Sender<IndexState>,
}

impl Default for CommentaryIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl CommentaryIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        let (state, _) = watch::channel(IndexState::Empty);
        Self {
            entries: RwLock::new(BTreeMap::new()),
            state,
        }
    }

    /// Create an index that is already complete, e.g. from a saved dump.
    pub fn ready_with(entries: BTreeMap<u32, String>) -> Self {
        let (state, _) = watch::channel(IndexState::Ready);
        Self {
            entries: RwLock::new(entries),
            state,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> IndexState {
        *self.state.borrow()
    }

    /// Whether every fetch has settled.
    pub fn is_ready(&self) -> bool {
        self.state() == IndexState::Ready
    }

    /// Subscribe to lifecycle changes.
    pub fn subscribe(&self) -> watch::Receiver<IndexState> {
        self.state.subscribe()
    }

    /// Wait until the index is ready.
    ///
    /// Returns immediately when already ready. Never resolves for an index that
    /// was not triggered.
    pub async fn wait_ready(&self) {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|state| *state == IndexState::Ready).await;
    }

    /// Read access to the entries built so far.
    pub fn entries(&self) -> RwLockReadGuard<'_, BTreeMap<u32, String>> {
        self.entries.read()
    }

    /// Commentary text for a page.
    pub fn get(&self, page: u32) -> Option<String> {
        self.entries.read().get(&page).cloned()
    }

    /// Number of pages with commentary.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no commentary has been indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Serialize the entries to JSON (`{"7": "text", ...}`).
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&*self.entries.read())
            .map_err(|e| SearchError::Serialization(e.to_string()))
    }

    /// Move from `Empty` to `Building`. Returns `false` in any other state.
    fn begin(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == IndexState::Empty {
                *state = IndexState::Building;
                true
            } else {
                false
            }
        })
    }

    fn insert(&self, page: u32, text: String) {
        if self.state() == IndexState::Building {
            self.entries.write().insert(page, text);
        }
    }

    fn finish(&self) {
        self.state.send_if_modified(|state| {
            if *state == IndexState::Building {
                *state = IndexState::Ready;
                true
            } else {
                false
            }
        });
    }
}

/// Summary of a finished build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    /// Fragments requested.
    pub requested: usize,
    /// Pages that produced commentary.
    pub indexed: usize,
    /// Fragments that were missing or failed to fetch.
    pub missing: usize,
}

/// Builds a [`CommentaryIndex`] from page fragments.
#[derive(Clone)]
pub struct CommentaryIndexBuilder {
    index: Arc<CommentaryIndex>,
    source: Arc<dyn FragmentSource>,
    pages: Arc<PageTable>,
    locator: PageLocator,
    extractor: CommentaryExtractor,
}

impl CommentaryIndexBuilder {
    /// Create a builder over `pages`, filling `index`.
    pub fn new(
        index: Arc<CommentaryIndex>,
        source: Arc<dyn FragmentSource>,
        pages: Arc<PageTable>,
        locator: PageLocator,
        extractor: CommentaryExtractor,
    ) -> Self {
        Self {
            index,
            source,
            pages,
            locator,
            extractor,
        }
    }

    /// The index being built.
    pub fn index(&self) -> &Arc<CommentaryIndex> {
        &self.index
    }

    /// Start the build in the background if it has not started yet.
    ///
    /// Returns `true` only for the call that started it. Must be called from
    /// within a tokio runtime.
    pub fn trigger(&self) -> bool {
        if !self.index.begin() {
            return false;
        }

        let builder = self.clone();
        tokio::spawn(async move {
            builder.run().await;
        });
        true
    }

    /// Trigger the build if needed and wait until it is ready.
    pub async fn build(&self) -> BuildStats {
        if self.index.begin() {
            return self.run().await;
        }

        self.index.wait_ready().await;
        BuildStats {
            requested: self.pages.len(),
            indexed: self.index.len(),
            missing: self.pages.len().saturating_sub(self.index.len()),
        }
    }

    async fn run(&self) -> BuildStats {
        let start = Instant::now();
        info!(pages = self.pages.len(), "Building commentary index");

        let mut pending: FuturesUnordered<_> = self
            .pages
            .iter()
            .map(|meta| self.fetch_commentary(meta.page))
            .collect();

        let mut stats = BuildStats {
            requested: pending.len(),
            ..BuildStats::default()
        };

        while let Some((page, commentary)) = pending.next().await {
            match commentary {
                Some(text) => {
                    self.index.insert(page, text);
                    stats.indexed += 1;
                }
                None => stats.missing += 1,
            }
        }

        self.index.finish();
        info!(
            indexed = stats.indexed,
            missing = stats.missing,
            duration_ms = start.elapsed().as_millis() as u64,
            "Commentary index ready"
        );
        stats
    }

    async fn fetch_commentary(&self, page: u32) -> (u32, Option<String>) {
        let path = self.locator.text_path(i64::from(page));

        let commentary = match self.source.fetch(&path).await {
            Ok(Some(html)) => self.extractor.extract(&html),
            Ok(None) => None,
            Err(e) => {
                debug!(page, error = %e, "Fragment fetch failed");
                None
            }
        };

        (page, commentary)
    }
}

impl std::fmt::Debug for CommentaryIndexBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommentaryIndexBuilder")
            .field("state", &self.index.state())
            .field("pages", &self.pages.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;
    use folio_core::PageMetadata;

    use super::*;

    struct MapSource {
        fragments: HashMap<String, String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FragmentSource for MapSource {
        async fn fetch(&self, path: &str) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if path.ends_with("0002.html") {
                return Err(SearchError::Fetch("connection reset".to_string()));
            }
            Ok(self.fragments.get(path).cloned())
        }
    }

    fn builder() -> (CommentaryIndexBuilder, Arc<MapSource>) {
        let mut fragments = HashMap::new();
        fragments.insert(
            "text/page_0001.html".to_string(),
            r#"<div class="commentary">First   note</div>"#.to_string(),
        );
        fragments.insert(
            "text/page_0003.html".to_string(),
            "<p>no commentary here</p>".to_string(),
        );
        let source = Arc::new(MapSource {
            fragments,
            calls: AtomicUsize::new(0),
        });

        let pages = PageTable::new(
            (1..=4)
                .map(|n| PageMetadata::new(n, format!("Page title {n}")))
                .collect(),
        );

        let builder = CommentaryIndexBuilder::new(
            Arc::new(CommentaryIndex::new()),
            source.clone(),
            Arc::new(pages),
            PageLocator::new(4),
            CommentaryExtractor::new("commentary").unwrap(),
        );
        (builder, source)
    }

    #[tokio::test]
    async fn test_build_indexes_and_skips_failures() {
        let (builder, source) = builder();
        let stats = builder.build().await;

        assert_eq!(stats.requested, 4);
        assert_eq!(stats.indexed, 1);
        assert_eq!(stats.missing, 3);
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);

        let index = builder.index();
        assert!(index.is_ready());
        assert_eq!(index.get(1).as_deref(), Some("First note"));
        assert!(index.get(2).is_none());
        assert!(index.get(3).is_none());
    }

    #[tokio::test]
    async fn test_trigger_is_idempotent() {
        let (builder, source) = builder();

        assert!(builder.trigger());
        assert!(!builder.trigger());
        assert!(!builder.trigger());
        assert_eq!(builder.index().state(), IndexState::Building);

        builder.index().wait_ready().await;
        assert!(!builder.trigger());
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_build_after_trigger_waits_for_same_batch() {
        let (builder, source) = builder();

        assert!(builder.trigger());
        let stats = builder.build().await;

        assert!(builder.index().is_ready());
        assert_eq!(stats.indexed, 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_subscribers_see_ready() {
        let (builder, _) = builder();
        let mut rx = builder.index().subscribe();

        builder.trigger();
        let state = rx
            .wait_for(|s| *s == IndexState::Ready)
            .await
            .map(|s| *s)
            .unwrap();
        assert_eq!(state, IndexState::Ready);
    }

    #[test]
    fn test_ready_with_and_json() {
        let mut entries = BTreeMap::new();
        entries.insert(7, "this appendix b contains tables".to_string());
        let index = CommentaryIndex::ready_with(entries);

        assert!(index.is_ready());
        assert_eq!(index.len(), 1);
        assert!(index.to_json().unwrap().contains("\"7\""));
    }
}
