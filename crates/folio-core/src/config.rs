//! Reader configuration management.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    error::{CoreError, Result},
    locator::PageLocator,
};

/// Main configuration structure for Folio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Book layout and resource locations.
    pub book: BookConfig,

    /// Search settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Reader session settings.
    #[serde(default)]
    pub reader: ReaderConfig,

    /// Directory relative paths are resolved against (the config file's parent).
    #[serde(skip)]
    pub root: PathBuf,
}

/// Book configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookConfig {
    /// Book title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Number of pages in the book.
    pub total_pages: u32,

    /// Where page resources live: an http(s) base URL or a local directory.
    #[serde(default = "default_source")]
    pub source: String,

    /// Path to the page metadata JSON table.
    #[serde(default = "default_metadata")]
    pub metadata: String,

    /// Directory holding page images.
    #[serde(default = "default_image_dir")]
    pub image_dir: String,

    /// Directory holding page text fragments.
    #[serde(default = "default_text_dir")]
    pub text_dir: String,

    /// Page image file extension.
    #[serde(default = "default_image_ext")]
    pub image_ext: String,

    /// Page text fragment file extension.
    #[serde(default = "default_text_ext")]
    pub text_ext: String,

    /// Class or id marking the commentary section inside a text fragment.
    #[serde(default = "default_commentary_marker")]
    pub commentary_marker: String,
}

/// Search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Minimum query length in characters.
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,

    /// Result cap for the inline panel.
    #[serde(default = "default_inline_limit")]
    pub inline_limit: usize,

    /// Result cap for the full-page overlay.
    #[serde(default = "default_overlay_limit")]
    pub overlay_limit: usize,

    /// Characters of context kept before a match.
    #[serde(default = "default_snippet_before")]
    pub snippet_before: usize,

    /// Characters of context kept after a match (plus the query length).
    #[serde(default = "default_snippet_after")]
    pub snippet_after: usize,
}

/// Reader session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Smallest accepted zoom percentage.
    #[serde(default = "default_zoom_min")]
    pub zoom_min: u16,

    /// Largest accepted zoom percentage.
    #[serde(default = "default_zoom_max")]
    pub zoom_max: u16,

    /// Zoom used when nothing is stored.
    #[serde(default = "default_zoom")]
    pub default_zoom: u16,

    /// Preference file, relative to the config root.
    #[serde(default = "default_prefs_file")]
    pub prefs_file: String,

    /// Prefix for preference keys.
    #[serde(default = "default_prefs_prefix")]
    pub prefs_prefix: String,

    /// Transport timeout for fragment fetches.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

// Default value functions
fn default_title() -> String {
    "Untitled".to_string()
}

fn default_source() -> String {
    ".".to_string()
}

fn default_metadata() -> String {
    "pages.json".to_string()
}

fn default_image_dir() -> String {
    "pages".to_string()
}

fn default_text_dir() -> String {
    "text".to_string()
}

fn default_image_ext() -> String {
    "jpg".to_string()
}

fn default_text_ext() -> String {
    "html".to_string()
}

fn default_commentary_marker() -> String {
    "commentary".to_string()
}

fn default_min_query_len() -> usize {
    2
}

fn default_inline_limit() -> usize {
    15
}

fn default_overlay_limit() -> usize {
    30
}

fn default_snippet_before() -> usize {
    30
}

fn default_snippet_after() -> usize {
    50
}

fn default_zoom_min() -> u16 {
    70
}

fn default_zoom_max() -> u16 {
    140
}

fn default_zoom() -> u16 {
    100
}

fn default_prefs_file() -> String {
    ".folio-prefs.json".to_string()
}

fn default_prefs_prefix() -> String {
    "folio".to_string()
}

fn default_fetch_timeout() -> u64 {
    15
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_len: default_min_query_len(),
            inline_limit: default_inline_limit(),
            overlay_limit: default_overlay_limit(),
            snippet_before: default_snippet_before(),
            snippet_after: default_snippet_after(),
        }
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            zoom_min: default_zoom_min(),
            zoom_max: default_zoom_max(),
            default_zoom: default_zoom(),
            prefs_file: default_prefs_file(),
            prefs_prefix: default_prefs_prefix(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

impl BookConfig {
    /// Create a book configuration with default layout for `total_pages` pages.
    pub fn new(total_pages: u32) -> Self {
        Self {
            title: default_title(),
            total_pages,
            source: default_source(),
            metadata: default_metadata(),
            image_dir: default_image_dir(),
            text_dir: default_text_dir(),
            image_ext: default_image_ext(),
            text_ext: default_text_ext(),
            commentary_marker: default_commentary_marker(),
        }
    }

    /// Whether the source is a remote base URL rather than a directory.
    pub fn is_remote(&self) -> bool {
        self.source.starts_with("http://") || self.source.starts_with("https://")
    }
}

impl Config {
    /// Build an in-memory configuration for a book of `total_pages` pages.
    pub fn for_book(total_pages: u32) -> Self {
        Self {
            book: BookConfig::new(total_pages),
            search: SearchConfig::default(),
            reader: ReaderConfig::default(),
            root: PathBuf::from("."),
        }
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content).map_err(|e| {
            CoreError::config_with_source(
                format!("Failed to parse config file: {}", path.display()),
                e,
            )
        })?;

        config.root = config_root(path);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration using the config crate, with `FOLIO__` environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix("FOLIO").separator("__"))
            .build()?;

        let mut config: Config = settings.try_deserialize()?;
        config.root = config_root(path);
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<()> {
        if self.book.total_pages == 0 {
            return Err(CoreError::config("book.total_pages must be at least 1"));
        }

        if self.book.source.trim().is_empty() {
            return Err(CoreError::config("book.source cannot be empty"));
        }

        if self.book.commentary_marker.trim().is_empty() {
            return Err(CoreError::config("book.commentary_marker cannot be empty"));
        }

        if self.search.min_query_len == 0 {
            return Err(CoreError::config("search.min_query_len must be at least 1"));
        }

        if self.search.inline_limit == 0 || self.search.overlay_limit == 0 {
            return Err(CoreError::config("search result limits must be at least 1"));
        }

        let reader = &self.reader;
        if reader.zoom_min > reader.zoom_max {
            return Err(CoreError::config(
                "reader.zoom_min cannot exceed reader.zoom_max",
            ));
        }

        if !(reader.zoom_min..=reader.zoom_max).contains(&reader.default_zoom) {
            return Err(CoreError::config(format!(
                "reader.default_zoom {} is outside {}..={}",
                reader.default_zoom, reader.zoom_min, reader.zoom_max
            )));
        }

        if self.book.is_remote() && self.book.source.ends_with('/') {
            tracing::warn!("book.source should not have a trailing slash");
        }

        Ok(())
    }

    /// Page locator for this book.
    pub fn locator(&self) -> PageLocator {
        PageLocator::from_config(&self.book)
    }

    /// Resolve a path from the config against the config root.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Location of the page metadata table.
    pub fn metadata_path(&self) -> PathBuf {
        self.resolve(&self.book.metadata)
    }

    /// Location of the preference file.
    pub fn prefs_path(&self) -> PathBuf {
        self.resolve(&self.reader.prefs_file)
    }

    /// Full URL for a resource path when the source is remote.
    pub fn url_for(&self, path: &str) -> String {
        let base = self.book.source.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

fn config_root(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn create_test_config() -> String {
        r#"
[book]
title = "Field Notes"
total_pages = 384
source = "https://example.com/book"
metadata = "data/pages.json"
image_ext = "png"
commentary_marker = "annotation"

[search]
inline_limit = 10
overlay_limit = 25

[reader]
zoom_min = 60
zoom_max = 150
default_zoom = 90
prefs_prefix = "notes"
"#
        .to_string()
    }

    #[test]
    fn test_load_config() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config_path = dir.path().join("folio.toml");
        let mut file = std::fs::File::create(&config_path).expect("create file");
        file.write_all(create_test_config().as_bytes())
            .expect("write");

        let config = Config::load(&config_path).expect("load config");

        assert_eq!(config.book.title, "Field Notes");
        assert_eq!(config.book.total_pages, 384);
        assert!(config.book.is_remote());
        assert_eq!(config.book.image_ext, "png");
        assert_eq!(config.book.text_dir, "text");
        assert_eq!(config.book.commentary_marker, "annotation");
        assert_eq!(config.search.inline_limit, 10);
        assert_eq!(config.search.overlay_limit, 25);
        assert_eq!(config.search.min_query_len, 2);
        assert_eq!(config.reader.default_zoom, 90);
        assert_eq!(config.reader.prefs_prefix, "notes");
        assert_eq!(config.metadata_path(), dir.path().join("data/pages.json"));
    }

    #[test]
    fn test_config_defaults() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config_path = dir.path().join("folio.toml");
        std::fs::write(&config_path, "[book]\ntotal_pages = 12\n").expect("write");

        let config = Config::load(&config_path).expect("load config");

        assert_eq!(config.book.title, "Untitled");
        assert_eq!(config.book.source, ".");
        assert!(!config.book.is_remote());
        assert_eq!(config.search.inline_limit, 15);
        assert_eq!(config.search.overlay_limit, 30);
        assert_eq!(config.search.snippet_before, 30);
        assert_eq!(config.search.snippet_after, 50);
        assert_eq!(config.reader.zoom_min, 70);
        assert_eq!(config.reader.zoom_max, 140);
        assert_eq!(config.reader.default_zoom, 100);
        assert_eq!(config.prefs_path(), dir.path().join(".folio-prefs.json"));
    }

    #[test]
    fn test_url_for() {
        let mut config = Config::for_book(3);
        config.book.source = "https://example.com/book/".to_string();

        assert_eq!(
            config.url_for("/text/page_0001.html"),
            "https://example.com/book/text/page_0001.html"
        );
        assert_eq!(
            config.url_for("text/page_0001.html"),
            "https://example.com/book/text/page_0001.html"
        );
    }

    #[test]
    fn test_config_validation_zero_pages() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config_path = dir.path().join("folio.toml");
        std::fs::write(&config_path, "[book]\ntotal_pages = 0\n").expect("write");

        let result = Config::load(&config_path);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("total_pages must be at least 1")
        );
    }

    #[test]
    fn test_config_validation_default_zoom_out_of_range() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config_path = dir.path().join("folio.toml");
        let content = "[book]\ntotal_pages = 5\n\n[reader]\ndefault_zoom = 200\n";
        std::fs::write(&config_path, content).expect("write");

        let result = Config::load(&config_path);
        assert!(result.unwrap_err().to_string().contains("default_zoom"));
    }

    #[test]
    fn test_config_not_found() {
        let result = Config::load(Path::new("/nonexistent/folio.toml"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not found"));
    }

    #[test]
    fn test_load_with_env_reads_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config_path = dir.path().join("folio.toml");
        std::fs::write(&config_path, "[book]\ntotal_pages = 42\n").expect("write");

        let config = Config::load_with_env(&config_path).expect("load config");
        assert_eq!(config.book.total_pages, 42);
        assert_eq!(config.root, dir.path());
    }
}
