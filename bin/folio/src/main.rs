//! Folio CLI
//!
//! Page reader for scanned books with title and commentary search.
//!
//! This is the binary entry point. The library functionality is in `lib.rs`.

use clap::Parser;
use color_eyre::eyre::Result;

/// Command-line interface for Folio.
#[derive(Parser)]
#[command(
    name = "folio",
    version,
    about = "A page reader with commentary search"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "folio.toml")]
    config: std::path::PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Search page titles, page text and commentary
    Search {
        /// Query text
        query: String,
        /// Use the overlay result limit
        #[arg(long)]
        overlay: bool,
        /// Print the first results without waiting for the commentary index
        #[arg(long)]
        no_wait: bool,
    },
    /// Build the commentary index
    Index {
        /// Write the index as JSON
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,
    },
    /// Show the resources for a page
    Page {
        /// Page number (clamped to the book)
        page: String,
    },
    /// Start an interactive reading session
    Read {
        /// Start page, overriding the stored one
        #[arg(short, long)]
        page: Option<String>,
    },
    /// Validate configuration and page metadata
    Check {
        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    folio::init_tracing(cli.verbose);

    match cli.command {
        Commands::Search {
            query,
            overlay,
            no_wait,
        } => {
            folio::cmd::search::run(&cli.config, &query, overlay, no_wait).await?;
        }
        Commands::Index { output } => {
            folio::cmd::index::run(&cli.config, output.as_deref()).await?;
        }
        Commands::Page { page } => {
            folio::cmd::page::run(&cli.config, &page)?;
        }
        Commands::Read { page } => {
            folio::cmd::read::run(&cli.config, page.as_deref()).await?;
        }
        Commands::Check { strict } => {
            folio::cmd::check::run(&cli.config, strict)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn test_cli_search_command_parsing() {
        let args = ["folio", "search", "appendix b"];
        let cli = Cli::parse_from(args);

        assert_eq!(cli.config, std::path::PathBuf::from("folio.toml"));
        assert_eq!(cli.verbose, 0);

        match cli.command {
            Commands::Search {
                query,
                overlay,
                no_wait,
            } => {
                assert_eq!(query, "appendix b");
                assert!(!overlay);
                assert!(!no_wait);
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_search_overlay_no_wait() {
        let args = ["folio", "search", "tables", "--overlay", "--no-wait"];
        let cli = Cli::parse_from(args);

        match cli.command {
            Commands::Search {
                overlay, no_wait, ..
            } => {
                assert!(overlay);
                assert!(no_wait);
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_index_command() {
        let args = ["folio", "index", "--output", "commentary.json"];
        let cli = Cli::parse_from(args);

        match cli.command {
            Commands::Index { output } => {
                assert_eq!(output, Some(std::path::PathBuf::from("commentary.json")));
            }
            _ => panic!("Expected Index command"),
        }
    }

    #[test]
    fn test_cli_page_accepts_raw_input() {
        let args = ["folio", "page", "12abc"];
        let cli = Cli::parse_from(args);

        match cli.command {
            Commands::Page { page } => assert_eq!(page, "12abc"),
            _ => panic!("Expected Page command"),
        }
    }

    #[test]
    fn test_cli_read_command() {
        let args = ["folio", "read", "--page", "42"];
        let cli = Cli::parse_from(args);

        match cli.command {
            Commands::Read { page } => assert_eq!(page.as_deref(), Some("42")),
            _ => panic!("Expected Read command"),
        }
    }

    #[test]
    fn test_cli_check_strict() {
        let args = ["folio", "check", "--strict"];
        let cli = Cli::parse_from(args);

        match cli.command {
            Commands::Check { strict } => assert!(strict),
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_cli_verbose_and_config() {
        let args = ["folio", "-vv", "-c", "books/atlas.toml", "check"];
        let cli = Cli::parse_from(args);

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, std::path::PathBuf::from("books/atlas.toml"));
    }
}
