//! The static page metadata table.
//!
//! The table is an externally supplied JSON array of `{page, title, searchText?}`
//! objects and is the source of truth for title and page-text search hits.

use std::{collections::HashMap, path::Path};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CoreError, Result};

/// Metadata for a single page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    /// 1-based page number.
    pub page: u32,

    /// Page title.
    pub title: String,

    /// Additional searchable text for the page.
    #[serde(
        rename = "searchText",
        alias = "search_text",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub search_text: Option<String>,
}

impl PageMetadata {
    /// Create metadata without search text.
    pub fn new(page: u32, title: impl Into<String>) -> Self {
        Self {
            page,
            title: title.into(),
            search_text: None,
        }
    }

    /// Attach search text.
    pub fn with_search_text(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self
    }
}

/// Ordered page metadata with lookup by page number.
#[derive(Debug, Clone, Default)]
pub struct PageTable {
    entries: Vec<PageMetadata>,
    by_page: HashMap<u32, usize>,
}

impl PageTable {
    /// Build a table, keeping the first entry for a repeated page number.
    pub fn new(entries: Vec<PageMetadata>) -> Self {
        let mut by_page = HashMap::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            by_page.entry(entry.page).or_insert(idx);
        }

        Self { entries, by_page }
    }

    /// Parse a table from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<PageMetadata> = serde_json::from_str(json)?;
        Ok(Self::new(entries))
    }

    /// Load a table from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::metadata(path, "metadata table not found"));
        }

        let json = std::fs::read_to_string(path)?;
        let entries: Vec<PageMetadata> = serde_json::from_str(&json)
            .map_err(|e| CoreError::metadata(path, e.to_string()))?;

        info!(path = %path.display(), pages = entries.len(), "Loaded page metadata");
        Ok(Self::new(entries))
    }

    /// All entries in table order.
    pub fn entries(&self) -> &[PageMetadata] {
        &self.entries
    }

    /// Iterate entries in table order.
    pub fn iter(&self) -> impl Iterator<Item = &PageMetadata> {
        self.entries.iter()
    }

    /// Look up a page.
    pub fn get(&self, page: u32) -> Option<&PageMetadata> {
        self.by_page.get(&page).map(|&idx| &self.entries[idx])
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Page numbers appearing more than once, ascending.
    pub fn duplicate_pages(&self) -> Vec<u32> {
        let mut seen = HashMap::new();
        for entry in &self.entries {
            *seen.entry(entry.page).or_insert(0usize) += 1;
        }

        let mut dups: Vec<u32> = seen
            .into_iter()
            .filter(|&(_, count)| count > 1)
            .map(|(page, _)| page)
            .collect();
        dups.sort_unstable();
        dups
    }
}
