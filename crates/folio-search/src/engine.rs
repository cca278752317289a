//! Query execution over page metadata and commentary.
//!
//! [`collect_results`] is pure: it takes whatever commentary has been indexed so
//! far and never touches the network. [`SearchEngine`] wraps it and starts the
//! commentary build on first use.

use std::{
    collections::{BTreeMap, btree_map::Entry},
    sync::Arc,
};

use folio_core::{Config, PageTable, SearchConfig};
use serde::{Deserialize, Serialize};

use crate::{
    Result,
    commentary::{CommentaryIndex, CommentaryIndexBuilder},
    extract::CommentaryExtractor,
    fragment::FragmentSource,
    render::{ResultList, Surface, render},
    snippet::{SnippetWindow, contains_folded, fold, make_snippet},
};

/// Which sources produced a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    /// Title or page search text matched.
    Page,
    /// Only the commentary matched.
    Commentary,
    /// Both the page and its commentary matched.
    Both,
}

/// A single search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Page number.
    pub page: u32,

    /// Page title, or `Page {n}` when the page has no metadata.
    pub title: String,

    /// Sources that matched.
    #[serde(rename = "type")]
    pub kind: ResultKind,

    /// Highlighted, HTML-safe excerpt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Tunables for query execution and result lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Minimum query length in characters.
    pub min_query_len: usize,

    /// Snippet context window.
    pub window: SnippetWindow,

    /// Result cap for the inline panel.
    pub inline_limit: usize,

    /// Result cap for the overlay.
    pub overlay_limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::from_config(&SearchConfig::default())
    }
}

impl SearchOptions {
    /// Options from the `[search]` config section.
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            min_query_len: config.min_query_len,
            window: SnippetWindow {
                before: config.snippet_before,
                after: config.snippet_after,
            },
            inline_limit: config.inline_limit,
            overlay_limit: config.overlay_limit,
        }
    }

    /// Result cap for a surface.
    pub fn limit(&self, surface: Surface) -> usize {
        match surface {
            Surface::Inline => self.inline_limit,
            Surface::Overlay => self.overlay_limit,
        }
    }

    /// Whether a normalized query is long enough to run.
    pub fn accepts(&self, query: &str) -> bool {
        query.chars().count() >= self.min_query_len
    }
}

/// Trim and lower-case raw input.
pub fn normalize_query(raw: &str) -> String {
    fold(raw.trim())
}

/// Collect deduplicated hits for `query`, ascending by page.
///
/// Page hits come first from the metadata table; commentary then adds new
/// `commentary` hits or upgrades existing ones to `both`. An existing snippet is
/// kept, so the page-derived snippet wins over the commentary one.
pub fn collect_results(
    query: &str,
    pages: Option<&PageTable>,
    commentary: &BTreeMap<u32, String>,
    options: &SearchOptions,
) -> Vec<SearchResult> {
    let query = normalize_query(query);
    let Some(pages) = pages else {
        return Vec::new();
    };
    if !options.accepts(&query) {
        return Vec::new();
    }

    let mut hits: BTreeMap<u32, SearchResult> = BTreeMap::new();

    for meta in pages.iter() {
        let text_match = meta
            .search_text
            .as_deref()
            .filter(|text| contains_folded(text, &query));

        if text_match.is_none() && !contains_folded(&meta.title, &query) {
            continue;
        }

        if let Entry::Vacant(slot) = hits.entry(meta.page) {
            slot.insert(SearchResult {
                page: meta.page,
                title: meta.title.clone(),
                kind: ResultKind::Page,
                snippet: text_match.and_then(|text| make_snippet(text, &query, options.window)),
            });
        }
    }

    for (&page, text) in commentary {
        if !contains_folded(text, &query) {
            continue;
        }

        match hits.entry(page) {
            Entry::Occupied(mut slot) => {
                let hit = slot.get_mut();
                hit.kind = ResultKind::Both;
                if hit.snippet.is_none() {
                    hit.snippet = make_snippet(text, &query, options.window);
                }
            }
            Entry::Vacant(slot) => {
                let title = pages
                    .get(page)
                    .map_or_else(|| format!("Page {page}"), |meta| meta.title.clone());
                slot.insert(SearchResult {
                    page,
                    title,
                    kind: ResultKind::Commentary,
                    snippet: make_snippet(text, &query, options.window),
                });
            }
        }
    }

    hits.into_values().collect()
}

/// Search over a page table and a lazily built commentary index.
#[derive(Debug, Clone)]
pub struct SearchEngine {
    pages: Option<Arc<PageTable>>,
    index: Arc<CommentaryIndex>,
    builder: Option<CommentaryIndexBuilder>,
    options: SearchOptions,
}

impl SearchEngine {
    /// Create an engine for the configured book.
    ///
    /// Without a page table search is disabled and no index is ever built.
    pub fn new(
        config: &Config,
        pages: Option<Arc<PageTable>>,
        source: Arc<dyn FragmentSource>,
    ) -> Result<Self> {
        let index = Arc::new(CommentaryIndex::new());
        let extractor = CommentaryExtractor::new(&config.book.commentary_marker)?;

        let builder = pages.as_ref().map(|pages| {
            CommentaryIndexBuilder::new(
                Arc::clone(&index),
                source,
                Arc::clone(pages),
                config.locator(),
                extractor,
            )
        });

        Ok(Self {
            pages,
            index,
            builder,
            options: SearchOptions::from_config(&config.search),
        })
    }

    /// Create an engine over an existing index, with no way to build it.
    pub fn with_index(
        pages: Option<Arc<PageTable>>,
        index: Arc<CommentaryIndex>,
        options: SearchOptions,
    ) -> Self {
        Self {
            pages,
            index,
            builder: None,
            options,
        }
    }

    /// Search options in effect.
    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// The commentary index.
    pub fn index(&self) -> &Arc<CommentaryIndex> {
        &self.index
    }

    /// The page table, when loaded.
    pub fn pages(&self) -> Option<&PageTable> {
        self.pages.as_deref()
    }

    /// The index builder, when search is enabled.
    pub fn builder(&self) -> Option<&CommentaryIndexBuilder> {
        self.builder.as_ref()
    }

    /// Start building the commentary index unless it is building or built.
    ///
    /// Returns `true` when this call started the build.
    pub fn ensure_index(&self) -> bool {
        self.builder.as_ref().is_some_and(|b| b.trigger())
    }

    /// Run a query, starting the index build on the first real query.
    pub fn search(&self, raw: &str) -> Vec<SearchResult> {
        let query = normalize_query(raw);
        if self.pages.is_none() || !self.options.accepts(&query) {
            return Vec::new();
        }

        self.ensure_index();
        let commentary = self.index.entries();
        collect_results(&query, self.pages(), &commentary, &self.options)
    }

    /// Run a query and render it for a surface.
    pub fn search_surface(&self, surface: Surface, raw: &str) -> ResultList {
        let results = self.search(raw);
        render(
            results,
            self.options.limit(surface),
            self.index.is_ready(),
        )
    }
}

#[cfg(test)]
mod tests {
    use folio_core::PageMetadata;

    use super::*;

    fn scenario_pages() -> PageTable {
        PageTable::new(vec![
            PageMetadata::new(3, "Intro"),
            PageMetadata::new(7, "Notes").with_search_text("see appendix B"),
        ])
    }

    fn commentary(entries: &[(u32, &str)]) -> BTreeMap<u32, String> {
        entries
            .iter()
            .map(|&(page, text)| (page, text.to_string()))
            .collect()
    }

    #[test]
    fn test_page_and_commentary_become_both() {
        let pages = scenario_pages();
        let commentary = commentary(&[(7, "this appendix b contains tables")]);

        let results = collect_results(
            "appendix",
            Some(&pages),
            &commentary,
            &SearchOptions::default(),
        );

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].page, 7);
        assert_eq!(results[0].title, "Notes");
        assert_eq!(results[0].kind, ResultKind::Both);
        assert_eq!(
            results[0].snippet.as_deref(),
            Some("see <mark>appendix</mark> B")
        );
    }

    #[test]
    fn test_title_hit_gets_commentary_snippet() {
        let pages = PageTable::new(vec![PageMetadata::new(2, "Appendix tables")]);
        let commentary = commentary(&[(2, "the appendix is long")]);

        let results = collect_results("appendix", Some(&pages), &commentary, &SearchOptions::default());
        assert_eq!(results[0].kind, ResultKind::Both);
        assert_eq!(
            results[0].snippet.as_deref(),
            Some("the <mark>appendix</mark> is long")
        );
    }

    #[test]
    fn test_title_only_hit_has_no_snippet() {
        let pages = scenario_pages();
        let results = collect_results("INTRO", Some(&pages), &BTreeMap::new(), &SearchOptions::default());

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].page, 3);
        assert_eq!(results[0].kind, ResultKind::Page);
        assert!(results[0].snippet.is_none());
    }

    #[test]
    fn test_commentary_only_hit_falls_back_to_page_title() {
        let pages = scenario_pages();
        let commentary = commentary(&[(12, "marginal gloss"), (3, "gloss on the intro")]);

        let results = collect_results("gloss", Some(&pages), &commentary, &SearchOptions::default());
        let summary: Vec<_> = results
            .iter()
            .map(|r| (r.page, r.title.as_str(), r.kind))
            .collect();

        assert_eq!(
            summary,
            vec![
                (3, "Intro", ResultKind::Commentary),
                (12, "Page 12", ResultKind::Commentary),
            ]
        );
        assert!(results.iter().all(|r| r.snippet.is_some()));
    }

    #[test]
    fn test_short_query_returns_nothing() {
        let pages = scenario_pages();
        for query in ["", " ", "a", "  n  "] {
            assert!(collect_results(query, Some(&pages), &BTreeMap::new(), &SearchOptions::default()).is_empty());
        }
    }

    #[test]
    fn test_missing_table_returns_nothing() {
        let commentary = commentary(&[(1, "anything at all")]);
        assert!(collect_results("anything", None, &commentary, &SearchOptions::default()).is_empty());
    }

    #[test]
    fn test_results_ascending_and_unique() {
        let pages = PageTable::new(vec![
            PageMetadata::new(9, "Tables"),
            PageMetadata::new(2, "More tables"),
            PageMetadata::new(5, "Figures").with_search_text("tables and figures"),
        ]);
        let commentary = commentary(&[(5, "tables"), (1, "tables"), (9, "tables")]);

        let results = collect_results("tables", Some(&pages), &commentary, &SearchOptions::default());
        let order: Vec<u32> = results.iter().map(|r| r.page).collect();
        assert_eq!(order, vec![1, 2, 5, 9]);
    }

    #[test]
    fn test_regex_metacharacters_match_literally() {
        let pages = PageTable::new(vec![
            PageMetadata::new(1, "a.b literal"),
            PageMetadata::new(2, "axb not literal"),
            PageMetadata::new(3, "f(x").with_search_text("calls f(x"),
        ]);

        let results = collect_results("a.b", Some(&pages), &BTreeMap::new(), &SearchOptions::default());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].page, 1);

        let results = collect_results("f(", Some(&pages), &BTreeMap::new(), &SearchOptions::default());
        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].snippet.as_deref(),
            Some("calls <mark>f(</mark>x")
        );
    }

    #[test]
    fn test_engine_without_pages_never_builds() {
        let index = Arc::new(CommentaryIndex::new());
        let engine = SearchEngine::with_index(None, Arc::clone(&index), SearchOptions::default());

        assert!(engine.search("appendix").is_empty());
        assert!(!engine.ensure_index());
        assert_eq!(index.state(), crate::IndexState::Empty);
    }

    #[test]
    fn test_engine_searches_ready_index() {
        let mut entries = BTreeMap::new();
        entries.insert(7, "this appendix b contains tables".to_string());
        let engine = SearchEngine::with_index(
            Some(Arc::new(scenario_pages())),
            Arc::new(CommentaryIndex::ready_with(entries)),
            SearchOptions::default(),
        );

        let list = engine.search_surface(Surface::Overlay, "  Appendix ");
        assert_eq!(list.len(), 1);
        assert!(!list.is_building());
        assert_eq!(list.results()[0].kind, ResultKind::Both);
    }

    #[test]
    fn test_result_serializes_type_field() {
        let result = SearchResult {
            page: 7,
            title: "Notes".to_string(),
            kind: ResultKind::Both,
            snippet: None,
        };

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"type\":\"both\""));
        assert!(!json.contains("snippet"));
    }
}
