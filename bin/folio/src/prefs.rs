//! Best-effort preference persistence.
//!
//! Four scalar preferences survive between sessions: current page, view mode,
//! zoom and theme. Every read and write goes through [`Preferences`], which logs
//! store failures at debug level and otherwise ignores them.

use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::debug;

use crate::session::{Theme, ViewMode};

/// Preference store errors.
#[derive(Debug, Error)]
pub enum PrefsError {
    /// The backing file could not be read or written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The store refuses all access.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A string key-value store.
pub trait PreferenceStore: Send {
    /// Read a value.
    fn get(&self, key: &str) -> Result<Option<String>, PrefsError>;

    /// Write a value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), PrefsError>;
}

/// In-memory store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PrefsError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PrefsError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by a JSON object on disk, rewritten on every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open the store at `path`; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PrefsError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self { path, values })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PrefsError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PrefsError> {
        self.values.insert(key.to_string(), value.to_string());
        let json = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

/// Typed, failure-swallowing access to the reader preferences.
pub struct Preferences {
    store: Box<dyn PreferenceStore>,
    prefix: String,
}

impl std::fmt::Debug for Preferences {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preferences")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl Preferences {
    /// Wrap a store; keys are `{prefix}-page` and so on.
    pub fn new(store: impl PreferenceStore + 'static, prefix: impl Into<String>) -> Self {
        Self {
            store: Box::new(store),
            prefix: prefix.into(),
        }
    }

    /// Open a JSON file store, falling back to memory when the file is unusable.
    pub fn open_file(path: &Path, prefix: &str) -> Self {
        match JsonFileStore::open(path) {
            Ok(store) => Self::new(store, prefix),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Preference file unusable, using memory");
                Self::new(MemoryStore::new(), prefix)
            }
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{}-{name}", self.prefix)
    }

    fn read(&self, name: &str) -> Option<String> {
        match self.store.get(&self.key(name)) {
            Ok(value) => value,
            Err(e) => {
                debug!(key = name, error = %e, "Preference read failed");
                None
            }
        }
    }

    fn write(&mut self, name: &str, value: &str) {
        let key = self.key(name);
        if let Err(e) = self.store.set(&key, value) {
            debug!(key = name, error = %e, "Preference write failed");
        }
    }

    /// Stored page, if it parses as a positive number.
    pub fn page(&self) -> Option<i64> {
        self.read("page")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|&page| page > 0)
    }

    /// Stored view mode.
    pub fn view(&self) -> Option<ViewMode> {
        self.read("view").and_then(|v| v.parse().ok())
    }

    /// Stored zoom percentage.
    pub fn zoom(&self) -> Option<u16> {
        self.read("zoom").and_then(|v| v.trim().parse().ok())
    }

    /// Stored theme.
    pub fn theme(&self) -> Option<Theme> {
        self.read("theme").and_then(|v| v.parse().ok())
    }

    /// Persist the current page.
    pub fn save_page(&mut self, page: u32) {
        self.write("page", &page.to_string());
    }

    /// Persist the view mode.
    pub fn save_view(&mut self, view: ViewMode) {
        self.write("view", &view.to_string());
    }

    /// Persist the zoom percentage.
    pub fn save_zoom(&mut self, zoom: u16) {
        self.write("zoom", &zoom.to_string());
    }

    /// Persist the theme.
    pub fn save_theme(&mut self, theme: Theme) {
        self.write("theme", &theme.to_string());
    }
}

/// A store that fails every operation, standing in for disabled storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStore;

impl PreferenceStore for UnavailableStore {
    fn get(&self, _key: &str) -> Result<Option<String>, PrefsError> {
        Err(PrefsError::Unavailable("storage disabled".to_string()))
    }

    fn set(&mut self, _key: &str, _value: &str) -> Result<(), PrefsError> {
        Err(PrefsError::Unavailable("quota exceeded".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_memory() {
        let mut prefs = Preferences::new(MemoryStore::new(), "folio");
        prefs.save_page(42);
        prefs.save_view(ViewMode::Text);
        prefs.save_zoom(115);
        prefs.save_theme(Theme::Dark);

        assert_eq!(prefs.page(), Some(42));
        assert_eq!(prefs.view(), Some(ViewMode::Text));
        assert_eq!(prefs.zoom(), Some(115));
        assert_eq!(prefs.theme(), Some(Theme::Dark));
    }

    #[test]
    fn test_garbage_values_are_ignored() {
        let mut store = MemoryStore::new();
        store.set("folio-page", "abc").unwrap();
        store.set("folio-view", "sideways").unwrap();
        store.set("folio-zoom", "big").unwrap();
        store.set("folio-theme", "neon").unwrap();

        let prefs = Preferences::new(store, "folio");
        assert_eq!(prefs.page(), None);
        assert_eq!(prefs.view(), None);
        assert_eq!(prefs.zoom(), None);
        assert_eq!(prefs.theme(), None);
    }

    #[test]
    fn test_unavailable_store_is_swallowed() {
        let mut prefs = Preferences::new(UnavailableStore, "folio");
        prefs.save_page(3);
        prefs.save_zoom(100);

        assert_eq!(prefs.page(), None);
        assert_eq!(prefs.zoom(), None);
    }

    #[test]
    fn test_json_file_store_persists() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("prefs.json");

        {
            let mut prefs = Preferences::open_file(&path, "book");
            prefs.save_page(12);
            prefs.save_theme(Theme::Light);
        }

        let prefs = Preferences::open_file(&path, "book");
        assert_eq!(prefs.page(), Some(12));
        assert_eq!(prefs.theme(), Some(Theme::Light));

        let raw = std::fs::read_to_string(&path).expect("read");
        assert!(raw.contains("\"book-page\": \"12\""));
    }

    #[test]
    fn test_corrupt_file_falls_back_to_memory() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "{not json").expect("write");

        let mut prefs = Preferences::open_file(&path, "folio");
        assert_eq!(prefs.page(), None);
        prefs.save_page(5);
        assert_eq!(prefs.page(), Some(5));
    }
}
