//! Snippet extraction and match highlighting.
//!
//! Matching is case-insensitive and counted in characters, not bytes, so
//! windows never split a multi-byte character.

use regex::RegexBuilder;

const ELLIPSIS: char = '…';

/// How much context a snippet keeps around the first match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnippetWindow {
    /// Characters kept before the match.
    pub before: usize,

    /// Characters kept after the match, in addition to the match itself.
    pub after: usize,
}

impl Default for SnippetWindow {
    fn default() -> Self {
        Self {
            before: 30,
            after: 50,
        }
    }
}

/// Lower-case a single character, keeping it when it has no one-to-one lower form.
pub fn fold_char(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

/// Lower-case a string character by character.
pub fn fold(text: &str) -> String {
    text.chars().map(fold_char).collect()
}

/// Character index of the first case-insensitive occurrence of `query`.
fn find_folded(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }

    haystack
        .windows(needle.len())
        .position(|window| window.iter().zip(needle).all(|(&a, &b)| fold_char(a) == b))
}

/// Whether `text` contains `folded_query` ignoring case.
pub fn contains_folded(text: &str, folded_query: &str) -> bool {
    !folded_query.is_empty() && fold(text).contains(folded_query)
}

/// Build a highlighted excerpt around the first occurrence of `query` in `text`.
///
/// Returns `None` when the query does not occur.
pub fn make_snippet(text: &str, query: &str, window: SnippetWindow) -> Option<String> {
    let needle: Vec<char> = fold(query).chars().collect();
    let chars: Vec<char> = text.chars().collect();
    let idx = find_folded(&chars, &needle)?;

    let start = idx.saturating_sub(window.before);
    let end = (idx + needle.len() + window.after).min(chars.len());
    let excerpt: String = chars[start..end].iter().collect();

    let mut snippet = String::with_capacity(excerpt.len() + 32);
    if start > 0 {
        snippet.push(ELLIPSIS);
    }
    snippet.push_str(&highlight(&excerpt, query));
    if end < chars.len() {
        snippet.push(ELLIPSIS);
    }

    Some(snippet)
}

/// HTML-escape `text` and wrap every case-insensitive occurrence of `query` in `<mark>`.
pub fn highlight(text: &str, query: &str) -> String {
    let escaped = escape_html(text);
    if query.is_empty() {
        return escaped;
    }

    let pattern = regex::escape(&escape_html(query));
    match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(re) => re.replace_all(&escaped, "<mark>$0</mark>").into_owned(),
        Err(e) => {
            tracing::debug!(error = %e, "Highlight pattern rejected");
            escaped
        }
    }
}

/// Escape HTML special characters.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
