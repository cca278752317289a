//! Search command - query page metadata and commentary

use std::path::Path;

use color_eyre::eyre::Result;
use folio_search::{ResultList, Surface};

use super::BookContext;

/// Run the search command.
///
/// Prints the results a surface would show. Unless `no_wait` is set, waits for
/// the commentary index and prints the re-evaluated list.
pub async fn run(config_path: &Path, query: &str, overlay: bool, no_wait: bool) -> Result<()> {
    let surface = if overlay {
        Surface::Overlay
    } else {
        Surface::Inline
    };
    tracing::info!(?config_path, query, %surface, no_wait, "Searching");

    let ctx = BookContext::load(config_path)?;
    if ctx.pages.is_none() {
        println!("  ⚠ No page metadata, search is disabled");
        return Ok(());
    }

    let list = ctx.engine.search_surface(surface, query);
    print_list(query, &list);

    if no_wait || !list.is_building() {
        return Ok(());
    }

    ctx.engine.index().wait_ready().await;
    println!();
    println!("Commentary index ready ({} entries)", ctx.engine.index().len());
    print_list(query, &ctx.engine.search_surface(surface, query));

    Ok(())
}

fn print_list(query: &str, list: &ResultList) {
    println!("Results for \"{}\":", query.trim());
    if list.is_empty() {
        println!("  No results");
    }
    for line in list.to_lines() {
        println!("  {line}");
    }
}
