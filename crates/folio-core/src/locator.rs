//! Page number to resource path mapping.

use serde::Serialize;

use crate::config::BookConfig;

/// Resource locations for a single page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLocation {
    /// Clamped 1-based page number.
    pub page: u32,

    /// Zero-padded four digit identifier.
    pub id: String,

    /// Relative path of the page image.
    pub image_path: String,

    /// Relative path of the page text fragment.
    pub text_path: String,
}

/// Maps page numbers onto deterministic resource paths.
#[derive(Debug, Clone)]
pub struct PageLocator {
    total_pages: u32,
    image_dir: String,
    text_dir: String,
    image_ext: String,
    text_ext: String,
}

impl PageLocator {
    /// Create a locator with the default `pages/` and `text/` layout.
    pub fn new(total_pages: u32) -> Self {
        Self::from_config(&BookConfig::new(total_pages))
    }

    /// Create a locator from book configuration.
    pub fn from_config(book: &BookConfig) -> Self {
        Self {
            total_pages: book.total_pages.max(1),
            image_dir: book.image_dir.trim_end_matches('/').to_string(),
            text_dir: book.text_dir.trim_end_matches('/').to_string(),
            image_ext: book.image_ext.clone(),
            text_ext: book.text_ext.clone(),
        }
    }

    /// Total number of pages.
    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Clamp a page number into `1..=total_pages`.
    pub fn clamp(&self, page: i64) -> u32 {
        // total_pages fits in u32 so the clamped value does too
        page.clamp(1, i64::from(self.total_pages)) as u32
    }

    /// Resolve the resource paths of a page.
    pub fn locate(&self, page: i64) -> PageLocation {
        let page = self.clamp(page);
        let id = format!("{page:04}");

        PageLocation {
            page,
            image_path: format!("{}/page_{id}.{}", self.image_dir, self.image_ext),
            text_path: format!("{}/page_{id}.{}", self.text_dir, self.text_ext),
            id,
        }
    }

    /// Text fragment path of a page.
    pub fn text_path(&self, page: i64) -> String {
        self.locate(page).text_path
    }
}

/// Parse user page input, falling back to page 1 when it is not a number.
///
/// Leading digits are honoured (`"12abc"` is page 12).
pub fn parse_page(input: &str) -> i64 {
    let trimmed = input.trim();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());

    match digits[..end].parse::<i64>() {
        Ok(0) | Err(_) => 1,
        Ok(value) => sign * value,
    }
}
