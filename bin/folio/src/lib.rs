//! Folio CLI Library
//!
//! Command implementations and the interactive reader session for the `folio`
//! binary.
//!
//! # Modules
//!
//! - [`cmd`] - Command implementations (search, index, page, read, check)
//! - [`session`] - Reader controller: page, view mode, zoom, theme, search surfaces
//! - [`prefs`] - Best-effort preference persistence
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! # async fn example() -> color_eyre::eyre::Result<()> {
//! folio::cmd::search::run(Path::new("folio.toml"), "appendix", false, false).await?;
//! # Ok(())
//! # }
//! ```

pub mod cmd;
pub mod prefs;
pub mod session;

pub use folio_core::Config;
pub use folio_search::{SearchEngine, SearchResult, Surface};
pub use prefs::Preferences;
pub use session::{ReaderSession, TextPane, Theme, ViewMode};

/// Initialize tracing with the specified verbosity level.
///
/// # Arguments
///
/// * `verbose` - Verbosity level (0 = WARN, 1 = INFO, 2 = DEBUG, 3+ = TRACE)
///
/// # Example
///
/// ```no_run
/// folio::init_tracing(2); // Enable DEBUG level logging
/// ```
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}
