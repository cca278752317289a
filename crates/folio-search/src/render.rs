//! Result lists for the inline panel and the full-page overlay.
//!
//! A [`ResultList`] is capped, keeps an active row for keyboard navigation and
//! carries a non-selectable placeholder row while the commentary index builds.

use serde::{Deserialize, Serialize};

use crate::{engine::SearchResult, snippet::escape_html};

/// Text of the placeholder row shown while the commentary index builds.
pub const BUILDING_PLACEHOLDER: &str = "Indexing commentary…";

/// The two interchangeable search surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    /// Compact panel inside the context menu.
    Inline,
    /// Full-page search overlay.
    Overlay,
}

impl Surface {
    /// Both surfaces.
    pub const ALL: [Surface; 2] = [Surface::Inline, Surface::Overlay];
}

impl std::fmt::Display for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Surface::Inline => f.write_str("inline"),
            Surface::Overlay => f.write_str("overlay"),
        }
    }
}

/// A rendered row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListRow<'a> {
    /// A selectable result.
    Result {
        /// The hit.
        result: &'a SearchResult,
        /// Whether keyboard focus is on this row.
        active: bool,
    },
    /// The "index still building" placeholder.
    Building,
}

/// A capped, navigable list of results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultList {
    results: Vec<SearchResult>,
    active: usize,
    building: bool,
}

/// Truncate `results` to `limit`, focus the first row and add the placeholder
/// when the index is not ready.
pub fn render(mut results: Vec<SearchResult>, limit: usize, index_ready: bool) -> ResultList {
    results.truncate(limit);
    ResultList {
        results,
        active: 0,
        building: !index_ready,
    }
}

impl ResultList {
    /// Number of selectable rows.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether there are no selectable rows.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Whether the placeholder row is shown.
    pub fn is_building(&self) -> bool {
        self.building
    }

    /// The selectable results.
    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    /// The focused result.
    pub fn active(&self) -> Option<&SearchResult> {
        self.results.get(self.active)
    }

    /// Index of the focused row.
    pub fn active_index(&self) -> usize {
        self.active
    }

    /// Move focus down, stopping at the last result.
    pub fn move_down(&mut self) {
        if self.active + 1 < self.results.len() {
            self.active += 1;
        }
    }

    /// Move focus up, stopping at the first result.
    pub fn move_up(&mut self) {
        self.active = self.active.saturating_sub(1);
    }

    /// Rows in display order, placeholder last.
    pub fn rows(&self) -> Vec<ListRow<'_>> {
        let mut rows: Vec<ListRow<'_>> = self
            .results
            .iter()
            .enumerate()
            .map(|(idx, result)| ListRow::Result {
                result,
                active: idx == self.active,
            })
            .collect();

        if self.building {
            rows.push(ListRow::Building);
        }
        rows
    }

    /// Invoke `on_select` with the result at `idx`.
    ///
    /// Returns `false` (and does not call back) for the placeholder or an
    /// out-of-range row.
    pub fn select<F>(&self, idx: usize, on_select: F) -> bool
    where
        F: FnOnce(&SearchResult),
    {
        match self.results.get(idx) {
            Some(result) => {
                on_select(result);
                true
            }
            None => false,
        }
    }

    /// Invoke `on_select` with the focused result.
    pub fn select_active<F>(&self, on_select: F) -> bool
    where
        F: FnOnce(&SearchResult),
    {
        self.select(self.active, on_select)
    }

    /// Render as `<li>` rows for a host page.
    pub fn to_html(&self) -> String {
        let mut html = String::new();

        for row in self.rows() {
            match row {
                ListRow::Result { result, active } => {
                    let class = if active { "sr-item active" } else { "sr-item" };
                    html.push_str(&format!(
                        r#"<li class="{class}" data-page="{page}" data-type="{kind}"><span class="sr-page">p.{page}</span> <span class="sr-title">{title}</span>"#,
                        page = result.page,
                        kind = kind_label(result),
                        title = escape_html(&result.title),
                    ));
                    if let Some(snippet) = &result.snippet {
                        html.push_str(&format!(r#"<span class="sr-snippet">{snippet}</span>"#));
                    }
                    html.push_str("</li>\n");
                }
                ListRow::Building => {
                    html.push_str(&format!(
                        "<li class=\"sr-building\" aria-disabled=\"true\">{BUILDING_PLACEHOLDER}</li>\n"
                    ));
                }
            }
        }

        html
    }

    /// Render as plain terminal lines; matches are shown in `[brackets]`.
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();

        for (idx, row) in self.rows().into_iter().enumerate() {
            match row {
                ListRow::Result { result, active } => {
                    let marker = if active { '>' } else { ' ' };
                    lines.push(format!(
                        "{marker} {:>2}. p.{:<4} {} [{}]",
                        idx + 1,
                        result.page,
                        result.title,
                        kind_label(result)
                    ));
                    if let Some(snippet) = &result.snippet {
                        lines.push(format!("         {}", snippet_to_plain(snippet)));
                    }
                }
                ListRow::Building => lines.push(format!("     ({BUILDING_PLACEHOLDER})")),
            }
        }

        lines
    }
}

fn kind_label(result: &SearchResult) -> &'static str {
    match result.kind {
        crate::ResultKind::Page => "page",
        crate::ResultKind::Commentary => "commentary",
        crate::ResultKind::Both => "both",
    }
}

/// Turn a highlighted snippet back into plain text with bracketed matches.
pub fn snippet_to_plain(snippet: &str) -> String {
    snippet
        .replace("<mark>", "[")
        .replace("</mark>", "]")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResultKind;

    fn result(page: u32, kind: ResultKind) -> SearchResult {
        SearchResult {
            page,
            title: format!("Title {page}"),
            kind,
            snippet: None,
        }
    }

    fn many(count: u32) -> Vec<SearchResult> {
        (1..=count).map(|p| result(p, ResultKind::Page)).collect()
    }

    #[test]
    fn test_truncates_to_surface_limit() {
        assert_eq!(render(many(40), 15, true).len(), 15);
        assert_eq!(render(many(40), 30, true).len(), 30);
        assert_eq!(render(many(3), 30, true).len(), 3);
    }

    #[test]
    fn test_first_row_active() {
        let list = render(many(3), 15, true);
        let rows = list.rows();

        assert!(matches!(rows[0], ListRow::Result { active: true, .. }));
        assert!(matches!(rows[1], ListRow::Result { active: false, .. }));
        assert_eq!(list.active().map(|r| r.page), Some(1));
    }

    #[test]
    fn test_placeholder_while_building() {
        let list = render(many(40), 15, false);
        let rows = list.rows();

        assert_eq!(rows.len(), 16);
        assert_eq!(rows[15], ListRow::Building);

        let empty = render(Vec::new(), 15, false);
        assert!(empty.is_empty());
        assert_eq!(empty.rows(), vec![ListRow::Building]);

        assert!(!render(many(2), 15, true).rows().contains(&ListRow::Building));
    }

    #[test]
    fn test_select_invokes_callback() {
        let list = render(many(3), 15, false);

        let mut chosen = None;
        assert!(list.select(2, |r| chosen = Some(r.page)));
        assert_eq!(chosen, Some(3));

        // The placeholder row sits past the results and is not selectable.
        let mut called = false;
        assert!(!list.select(3, |_| called = true));
        assert!(!called);
    }

    #[test]
    fn test_keyboard_navigation_stays_in_bounds() {
        let mut list = render(many(2), 15, true);

        list.move_up();
        assert_eq!(list.active_index(), 0);
        list.move_down();
        list.move_down();
        assert_eq!(list.active_index(), 1);

        let mut chosen = None;
        list.select_active(|r| chosen = Some(r.page));
        assert_eq!(chosen, Some(2));
    }

    #[test]
    fn test_html_rows() {
        let mut hit = result(7, ResultKind::Both);
        hit.title = "Notes & <Queries>".to_string();
        hit.snippet = Some("see <mark>appendix</mark> B".to_string());

        let html = render(vec![hit], 15, false).to_html();
        assert!(html.contains(r#"<li class="sr-item active" data-page="7" data-type="both">"#));
        assert!(html.contains(r#"<span class="sr-page">p.7</span>"#));
        assert!(html.contains("Notes &amp; &lt;Queries&gt;"));
        assert!(html.contains(r#"<span class="sr-snippet">see <mark>appendix</mark> B</span>"#));
        assert!(html.contains("sr-building"));
    }

    #[test]
    fn test_terminal_lines() {
        let mut hit = result(7, ResultKind::Commentary);
        hit.snippet = Some("fish &amp; <mark>chips</mark>".to_string());

        let lines = render(vec![hit], 15, true).to_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(">  1. p.7"));
        assert!(lines[0].ends_with("[commentary]"));
        assert!(lines[1].trim_start().starts_with("fish & [chips]"));
    }
}
