//! Commentary extraction from page fragments.
//!
//! Finds the first element whose `class` or `id` carries the commentary marker,
//! takes everything up to its matching close tag and reduces it to plain text.

use regex::{Captures, Regex};

use crate::{Result, SearchError};

/// Extracts the commentary section's plain text from fragment markup.
#[derive(Debug, Clone)]
pub struct CommentaryExtractor {
    opening: Regex,
    tag: Regex,
    entity: Regex,
}

impl CommentaryExtractor {
    /// Create an extractor for elements marked with `marker`.
    pub fn new(marker: &str) -> Result<Self> {
        let marker = regex::escape(marker);
        let opening = format!(
            r#"(?is)<([a-z][a-z0-9]*)\b[^>]*?\b(?:class|id)\s*=\s*(?:"[^"]*?\b{marker}\b[^"]*"|'[^']*?\b{marker}\b[^']*'|{marker}\b)[^>]*?(/?)>"#
        );

        Ok(Self {
            opening: compile(&opening)?,
            tag: compile(r"(?is)<(/?)([a-z][a-z0-9]*)\b[^>]*?(/?)>")?,
            entity: compile(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);")?,
        })
    }

    /// Extract the normalized commentary text, if the fragment has any.
    ///
    /// Returns `None` for a missing, unterminated or empty section.
    pub fn extract(&self, html: &str) -> Option<String> {
        let open = self.opening.captures(html)?;
        if !open[2].is_empty() {
            return None;
        }

        let name = open[1].to_ascii_lowercase();
        let body_start = open.get(0)?.end();
        let body_end = self.matching_close(html, body_start, &name)?;

        let text = self.plain_text(&html[body_start..body_end]);
        (!text.is_empty()).then_some(text)
    }

    fn matching_close(&self, html: &str, from: usize, name: &str) -> Option<usize> {
        let mut depth = 1usize;

        for caps in self.tag.captures_iter(&html[from..]) {
            if !caps[2].eq_ignore_ascii_case(name) {
                continue;
            }

            let whole = caps.get(0)?;
            if &caps[1] == "/" {
                depth -= 1;
                if depth == 0 {
                    return Some(from + whole.start());
                }
            } else if caps[3].is_empty() {
                depth += 1;
            }
        }

        None
    }

    /// Strip tags, decode entities and collapse whitespace.
    pub fn plain_text(&self, markup: &str) -> String {
        let stripped = self.tag.replace_all(markup, " ");
        let decoded = self
            .entity
            .replace_all(&stripped, |caps: &Captures| decode_entity(&caps[1], &caps[0]));
        normalize_whitespace(&decoded)
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| SearchError::Pattern(e.to_string()))
}

fn decode_entity(name: &str, raw: &str) -> String {
    let decoded = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            if let Some(hex) = name
                .strip_prefix("#x")
                .or_else(|| name.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                None
            }
        }
    };

    decoded.map_or_else(|| raw.to_string(), String::from)
}

/// Collapse runs of whitespace to single spaces and trim.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
