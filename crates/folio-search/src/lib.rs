//! Folio Search Library
//!
//! In-memory search over page titles, page text and per-page commentary.
//!
//! # Features
//!
//! - **Commentary index**: fetches every page fragment concurrently, extracts the
//!   commentary section and builds once (`Empty → Building → Ready`)
//! - **Search engine**: substring matching over metadata and commentary with
//!   deduplicated, page-ordered results
//! - **Snippets**: HTML-escaped excerpts with `<mark>` highlighting
//! - **Result lists**: capped, keyboard-navigable lists for the inline panel and
//!   the overlay
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use folio_core::{Config, PageTable};
//! use folio_search::{DirFragmentSource, SearchEngine, Surface};
//!
//! # async fn run() -> folio_search::Result<()> {
//! let config = Config::for_book(384);
//! let pages = PageTable::load("pages.json".as_ref()).ok().map(Arc::new);
//! let source = Arc::new(DirFragmentSource::new("."));
//! let engine = SearchEngine::new(&config, pages, source)?;
//!
//! let list = engine.search_surface(Surface::Inline, "appendix");
//! for line in list.to_lines() {
//!     println!("{line}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod commentary;
pub mod engine;
pub mod extract;
pub mod fragment;
pub mod render;
pub mod snippet;

pub use commentary::{BuildStats, CommentaryIndex, CommentaryIndexBuilder, IndexState};
pub use engine::{
    ResultKind, SearchEngine, SearchOptions, SearchResult, collect_results, normalize_query,
};
pub use extract::CommentaryExtractor;
pub use fragment::{DirFragmentSource, FragmentSource, HttpFragmentSource, source_from_config};
pub use render::{BUILDING_PLACEHOLDER, ListRow, ResultList, Surface, render};
pub use snippet::{SnippetWindow, highlight, make_snippet};
use thiserror::Error;

/// Search-related errors.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Transport failure while fetching a fragment.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Pattern compilation error.
    #[error("Pattern error: {0}")]
    Pattern(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        Self::Fetch(err.to_string())
    }
}

/// Result type for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;
