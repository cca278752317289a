//! Page command - resolve a page number to its resources

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use folio_core::{Config, parse_page};

/// Run the page command.
pub fn run(config_path: &Path, input: &str) -> Result<()> {
    let config = Config::load_with_env(config_path).wrap_err("Failed to load configuration")?;
    let locator = config.locator();
    let location = locator.locate(parse_page(input));

    tracing::debug!(input, page = location.page, "Resolved page");

    println!("Page {} of {}", location.page, locator.total_pages());
    println!("  Id:    {}", location.id);
    println!("  Image: {}", resource(&config, &location.image_path));
    println!("  Text:  {}", resource(&config, &location.text_path));

    Ok(())
}

fn resource(config: &Config, path: &str) -> String {
    if config.book.is_remote() {
        config.url_for(path)
    } else {
        config
            .resolve(&config.book.source)
            .join(path)
            .display()
            .to_string()
    }
}
