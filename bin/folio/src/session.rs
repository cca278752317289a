//! Reader session: current page, view mode, zoom, theme and search surfaces.

use std::{collections::HashMap, str::FromStr, sync::Arc};

use folio_core::{Config, PageLocation, PageLocator};
use folio_search::{
    FragmentSource, IndexState, ResultKind, ResultList, SearchEngine, SearchResult, Surface,
    normalize_query,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::prefs::Preferences;

/// Shown while the current page's text is being fetched.
pub const TEXT_LOADING: &str = "Loading…";
/// Shown when the page has no text fragment.
pub const TEXT_UNAVAILABLE: &str = "No text available for this page.";
/// Shown when fetching the text fragment failed.
pub const TEXT_FAILED: &str = "Could not load text.";

/// Session errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Zoom request outside the accepted range.
    #[error("zoom {level}% is outside {min}%..={max}%")]
    ZoomOutOfRange { level: u16, min: u16, max: u16 },

    /// Unrecognized view mode or theme name.
    #[error("unknown {kind}: {value}")]
    Unknown { kind: &'static str, value: String },
}

/// How the current page is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Scanned page image.
    #[default]
    Image,
    /// Extracted page text.
    Text,
}

impl ViewMode {
    /// The other mode.
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Image => ViewMode::Text,
            ViewMode::Text => ViewMode::Image,
        }
    }

    /// Label of the control that switches away from this mode.
    pub fn toggle_label(self) -> &'static str {
        match self {
            ViewMode::Image => "Switch to Text View",
            ViewMode::Text => "Switch to Image View",
        }
    }
}

impl std::fmt::Display for ViewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewMode::Image => f.write_str("image"),
            ViewMode::Text => f.write_str("text"),
        }
    }
}

impl FromStr for ViewMode {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "image" => Ok(ViewMode::Image),
            "text" => Ok(ViewMode::Text),
            other => Err(SessionError::Unknown {
                kind: "view mode",
                value: other.to_string(),
            }),
        }
    }
}

/// Colour theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// The other theme.
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Theme::Light => f.write_str("light"),
            Theme::Dark => f.write_str("dark"),
        }
    }
}

impl FromStr for Theme {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(SessionError::Unknown {
                kind: "theme",
                value: other.to_string(),
            }),
        }
    }
}

/// State of the text view for the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextPane {
    /// Image view is active; nothing fetched.
    Hidden,
    /// Fetch in flight.
    Loading,
    /// Fragment markup for the current page.
    Loaded(String),
    /// The page has no text fragment.
    Unavailable,
    /// The fetch failed.
    Failed,
}

impl TextPane {
    /// Status message for the non-loaded states.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            TextPane::Loading => Some(TEXT_LOADING),
            TextPane::Unavailable => Some(TEXT_UNAVAILABLE),
            TextPane::Failed => Some(TEXT_FAILED),
            TextPane::Hidden | TextPane::Loaded(_) => None,
        }
    }
}

/// The reader controller.
pub struct ReaderSession {
    locator: PageLocator,
    location: PageLocation,
    view: ViewMode,
    zoom: u16,
    zoom_min: u16,
    zoom_max: u16,
    theme: Theme,
    text: TextPane,
    source: Arc<dyn FragmentSource>,
    engine: SearchEngine,
    prefs: Preferences,
    open: HashMap<Surface, String>,
}

impl std::fmt::Debug for ReaderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderSession")
            .field("location", &self.location)
            .field("view", &self.view)
            .field("zoom", &self.zoom)
            .field("theme", &self.theme)
            .field("open", &self.open)
            .finish_non_exhaustive()
    }
}

impl ReaderSession {
    /// Create a session on page 1 in image view with the default zoom.
    pub fn new(
        config: &Config,
        engine: SearchEngine,
        source: Arc<dyn FragmentSource>,
        prefs: Preferences,
    ) -> Self {
        let locator = config.locator();
        Self {
            location: locator.locate(1),
            locator,
            view: ViewMode::Image,
            zoom: config.reader.default_zoom,
            zoom_min: config.reader.zoom_min,
            zoom_max: config.reader.zoom_max,
            theme: Theme::default(),
            text: TextPane::Hidden,
            source,
            engine,
            prefs,
            open: HashMap::new(),
        }
    }

    /// Restore stored preferences and open the start page.
    ///
    /// `start_page` wins over the stored page; an out-of-range stored zoom or an
    /// unknown theme is ignored.
    pub async fn restore(&mut self, start_page: Option<i64>) {
        if self.prefs.view() == Some(ViewMode::Text) {
            self.view = ViewMode::Text;
        }

        if let Some(zoom) = self.prefs.zoom() {
            if self.zoom_in_range(zoom) {
                self.zoom = zoom;
            }
        }

        if let Some(theme) = self.prefs.theme() {
            self.theme = theme;
        }

        let page = start_page.or_else(|| self.prefs.page()).unwrap_or(1);
        debug!(page, view = %self.view, zoom = self.zoom, "Restored session");
        self.go_to_page(page).await;
    }

    /// Navigate to a page (clamped), loading its text in text view.
    pub async fn go_to_page(&mut self, page: i64) -> &PageLocation {
        self.location = self.locator.locate(page);
        if self.view == ViewMode::Text {
            self.load_text().await;
        }
        self.prefs.save_page(self.location.page);
        &self.location
    }

    /// Next page; stays on the last page.
    pub async fn next_page(&mut self) -> &PageLocation {
        self.go_to_page(i64::from(self.location.page) + 1).await
    }

    /// Previous page; stays on the first page.
    pub async fn prev_page(&mut self) -> &PageLocation {
        self.go_to_page(i64::from(self.location.page) - 1).await
    }

    /// Switch view mode; entering text view loads the current page's text.
    pub async fn set_view(&mut self, mode: ViewMode) {
        self.view = mode;
        match mode {
            ViewMode::Image => self.text = TextPane::Hidden,
            ViewMode::Text => self.load_text().await,
        }
        self.prefs.save_view(mode);
    }

    /// Flip between image and text view.
    pub async fn toggle_view(&mut self) {
        self.set_view(self.view.toggled()).await;
    }

    /// Set the zoom percentage; out-of-range levels are rejected and the zoom
    /// stays unchanged.
    pub fn set_zoom(&mut self, level: u16) -> Result<u16, SessionError> {
        if !self.zoom_in_range(level) {
            return Err(SessionError::ZoomOutOfRange {
                level,
                min: self.zoom_min,
                max: self.zoom_max,
            });
        }

        self.zoom = level;
        self.prefs.save_zoom(level);
        Ok(level)
    }

    fn zoom_in_range(&self, level: u16) -> bool {
        (self.zoom_min..=self.zoom_max).contains(&level)
    }

    /// Set the theme.
    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.prefs.save_theme(theme);
    }

    /// Flip the theme.
    pub fn toggle_theme(&mut self) -> Theme {
        self.set_theme(self.theme.toggled());
        self.theme
    }

    async fn load_text(&mut self) {
        self.text = TextPane::Loading;
        let path = self.location.text_path.clone();

        self.text = match self.source.fetch(&path).await {
            Ok(Some(html)) => TextPane::Loaded(html),
            Ok(None) => TextPane::Unavailable,
            Err(e) => {
                debug!(page = self.location.page, error = %e, "Text load failed");
                TextPane::Failed
            }
        };
    }

    /// Current page number.
    pub fn page(&self) -> u32 {
        self.location.page
    }

    /// Resource locations of the current page.
    pub fn location(&self) -> &PageLocation {
        &self.location
    }

    /// Current view mode.
    pub fn view(&self) -> ViewMode {
        self.view
    }

    /// Current zoom percentage.
    pub fn zoom(&self) -> u16 {
        self.zoom
    }

    /// Current theme.
    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Text view state.
    pub fn text(&self) -> &TextPane {
        &self.text
    }

    /// `Page n of N`.
    pub fn page_label(&self) -> String {
        format!(
            "Page {} of {}",
            self.location.page,
            self.locator.total_pages()
        )
    }

    /// Reading progress in percent.
    pub fn progress_percent(&self) -> f64 {
        f64::from(self.location.page) / f64::from(self.locator.total_pages()) * 100.0
    }

    /// The search engine.
    pub fn engine(&self) -> &SearchEngine {
        &self.engine
    }

    /// Subscribe to commentary index lifecycle changes.
    pub fn index_events(&self) -> watch::Receiver<IndexState> {
        self.engine.index().subscribe()
    }

    /// Open a search surface with an empty query.
    ///
    /// Opening the overlay starts the commentary index build.
    pub fn open_surface(&mut self, surface: Surface) {
        self.open.insert(surface, String::new());
        if surface == Surface::Overlay && self.engine.ensure_index() {
            info!("Commentary index build started by overlay");
        }
    }

    /// Close a search surface; its results are no longer refreshed.
    pub fn close_surface(&mut self, surface: Surface) {
        self.open.remove(&surface);
    }

    /// Whether a surface is open.
    pub fn is_open(&self, surface: Surface) -> bool {
        self.open.contains_key(&surface)
    }

    /// Run a query on a surface, opening it if needed.
    pub fn search(&mut self, surface: Surface, raw: &str) -> ResultList {
        self.open.insert(surface, raw.to_string());
        self.engine.search_surface(surface, raw)
    }

    /// Re-run the active query of every open surface.
    pub fn refresh_active(&self) -> Vec<(Surface, ResultList)> {
        Surface::ALL
            .into_iter()
            .filter_map(|surface| {
                let raw = self.open.get(&surface)?;
                let query = normalize_query(raw);
                if !self.engine.options().accepts(&query) {
                    return None;
                }
                Some((surface, self.engine.search_surface(surface, raw)))
            })
            .collect()
    }

    /// Jump to a chosen result and close the surface it came from.
    ///
    /// A commentary-only hit forces text view first.
    pub async fn select_result(&mut self, surface: Surface, result: &SearchResult) {
        if result.kind == ResultKind::Commentary && self.view != ViewMode::Text {
            self.view = ViewMode::Text;
            self.prefs.save_view(ViewMode::Text);
        }

        self.close_surface(surface);
        self.go_to_page(i64::from(result.page)).await;
    }
}
