//! Index command - build the commentary index

use std::{path::Path, time::Instant};

use color_eyre::eyre::{Result, WrapErr, bail};

use super::BookContext;

/// Run the index command.
///
/// Fetches every page's fragment once, reports counts and optionally writes the
/// index as a JSON object keyed by page.
pub async fn run(config_path: &Path, output: Option<&Path>) -> Result<()> {
    let start = Instant::now();
    tracing::info!(?config_path, ?output, "Building commentary index");

    let ctx = BookContext::load(config_path)?;
    let Some(builder) = ctx.engine.builder() else {
        bail!("No page metadata at {}", ctx.config.metadata_path().display());
    };

    let stats = builder.build().await;

    println!("Commentary index:");
    println!("  Pages:     {}", stats.requested);
    println!("  Indexed:   {}", stats.indexed);
    println!("  Missing:   {}", stats.missing);
    println!("  Duration:  {:.2?}", start.elapsed());

    if let Some(path) = output {
        let json = ctx.engine.index().to_json()?;
        std::fs::write(path, json)
            .wrap_err_with(|| format!("Failed to write index: {}", path.display()))?;
        println!("  ✓ Written to {}", path.display());
    }

    Ok(())
}
