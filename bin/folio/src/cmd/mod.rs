//! Command implementations.

pub mod check;
pub mod index;
pub mod page;
pub mod read;
pub mod search;

use std::{path::Path, sync::Arc};

use color_eyre::eyre::{Result, WrapErr};
use folio_core::{Config, PageTable};
use folio_search::{FragmentSource, SearchEngine, source_from_config};

/// Everything a command needs to talk to one book.
pub struct BookContext {
    pub config: Config,
    pub pages: Option<Arc<PageTable>>,
    pub source: Arc<dyn FragmentSource>,
    pub engine: SearchEngine,
}

impl BookContext {
    /// Load configuration, the metadata table and the fragment source.
    ///
    /// A missing metadata file is not an error; search is then disabled.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config =
            Config::load_with_env(config_path).wrap_err("Failed to load configuration")?;
        let pages = load_pages(&config)?;
        let source = source_from_config(&config).wrap_err("Failed to open fragment source")?;
        let engine = SearchEngine::new(&config, pages.clone(), source.clone())
            .wrap_err("Failed to create search engine")?;

        Ok(Self {
            config,
            pages,
            source,
            engine,
        })
    }
}

/// Load the page metadata table, or `None` when the file does not exist.
pub fn load_pages(config: &Config) -> Result<Option<Arc<PageTable>>> {
    let path = config.metadata_path();
    if !path.exists() {
        tracing::warn!(path = %path.display(), "Page metadata not found, search disabled");
        return Ok(None);
    }

    let table = PageTable::load(&path)
        .wrap_err_with(|| format!("Failed to load page metadata: {}", path.display()))?;
    Ok(Some(Arc::new(table)))
}
