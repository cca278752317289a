//! Check command - validate configuration and page metadata

use std::path::Path;

use color_eyre::eyre::{Result, bail};
use folio_core::{Config, PageTable};

/// Validation result.
#[derive(Debug, Default)]
struct ValidationResult {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationResult {
    fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Run the check command.
pub fn run(config_path: &Path, strict: bool) -> Result<()> {
    tracing::info!(?config_path, strict, "Checking configuration and metadata");

    let mut result = ValidationResult::default();

    println!("Checking configuration...");
    let config = match Config::load_with_env(config_path) {
        Ok(c) => {
            println!("  ✓ Configuration valid");
            Some(c)
        }
        Err(e) => {
            result.add_error(format!("Configuration error: {e}"));
            println!("  ✗ Configuration invalid: {e}");
            None
        }
    };

    if let Some(ref cfg) = config {
        println!("\nChecking page metadata...");
        check_metadata(cfg, &mut result);

        if !cfg.book.is_remote() {
            println!("\nChecking directories...");
            check_directories(cfg, &mut result);
        }
    }

    println!();
    println!("Summary:");
    println!("  Errors:   {}", result.errors.len());
    println!("  Warnings: {}", result.warnings.len());

    if result.has_errors() {
        println!();
        println!("Errors:");
        for err in &result.errors {
            println!("  ✗ {err}");
        }
    }

    if result.has_warnings() {
        println!();
        println!("Warnings:");
        for warn in &result.warnings {
            println!("  ⚠ {warn}");
        }
    }

    if result.has_errors() {
        bail!("Validation failed with {} error(s)", result.errors.len());
    }

    if strict && result.has_warnings() {
        bail!(
            "Validation failed with {} warning(s) (strict mode)",
            result.warnings.len()
        );
    }

    println!();
    println!("✓ All checks passed");

    Ok(())
}

fn check_metadata(config: &Config, result: &mut ValidationResult) {
    let path = config.metadata_path();
    if !path.exists() {
        result.add_warning(format!(
            "Page metadata missing, search disabled: {}",
            path.display()
        ));
        println!("  ⚠ {} missing", path.display());
        return;
    }

    let table = match PageTable::load(&path) {
        Ok(table) => table,
        Err(e) => {
            result.add_error(format!("Page metadata error: {e}"));
            println!("  ✗ {} invalid", path.display());
            return;
        }
    };

    validate_table(&table, config.book.total_pages, result);
    println!("  ✓ {} page entries checked", table.len());
}

/// Check page range, duplicates and titles.
fn validate_table(table: &PageTable, total_pages: u32, result: &mut ValidationResult) {
    for meta in table.iter() {
        if meta.page == 0 || meta.page > total_pages {
            result.add_error(format!(
                "Page {} is outside 1..={total_pages} ({:?})",
                meta.page, meta.title
            ));
        }

        if meta.title.trim().is_empty() {
            result.add_warning(format!("Page {} has an empty title", meta.page));
        }
    }

    for page in table.duplicate_pages() {
        result.add_warning(format!("Page {page} appears more than once, first entry kept"));
    }
}

fn check_directories(config: &Config, result: &mut ValidationResult) {
    let source = config.resolve(&config.book.source);
    let dirs = [
        (&config.book.image_dir, false),
        (&config.book.text_dir, true),
    ];

    for (dir, used_by_search) in dirs {
        let path = source.join(dir);
        if path.is_dir() {
            println!("  ✓ {dir}/ exists");
        } else if used_by_search {
            result.add_warning(format!("Text directory missing: {}", path.display()));
            println!("  ⚠ {dir}/ missing (commentary search finds nothing)");
        } else {
            result.add_warning(format!("Image directory missing: {}", path.display()));
            println!("  ⚠ {dir}/ missing");
        }
    }
}

#[cfg(test)]
mod tests {
    use folio_core::PageMetadata;

    use super::*;

    #[test]
    fn test_validate_table_flags_range_and_titles() {
        let table = PageTable::new(vec![
            PageMetadata::new(1, "Cover"),
            PageMetadata::new(0, "Zero"),
            PageMetadata::new(2, "  "),
            PageMetadata::new(500, "Beyond"),
        ]);

        let mut result = ValidationResult::default();
        validate_table(&table, 384, &mut result);

        assert_eq!(result.errors.len(), 2);
        assert!(result.errors.iter().any(|e| e.contains("Page 500")));
        assert_eq!(result.warnings, vec!["Page 2 has an empty title"]);
    }

    #[test]
    fn test_validate_table_warns_on_duplicates() {
        let table = PageTable::new(vec![
            PageMetadata::new(4, "First"),
            PageMetadata::new(4, "Second"),
        ]);

        let mut result = ValidationResult::default();
        validate_table(&table, 10, &mut result);

        assert!(!result.has_errors());
        assert!(result.warnings[0].contains("Page 4 appears more than once"));
    }

    #[test]
    fn test_run_passes_on_valid_book() {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::create_dir_all(dir.path().join("pages")).expect("mkdir");
        std::fs::create_dir_all(dir.path().join("text")).expect("mkdir");
        std::fs::write(
            dir.path().join("pages.json"),
            r#"[{"page": 1, "title": "Cover"}]"#,
        )
        .expect("write");
        let config_path = dir.path().join("folio.toml");
        std::fs::write(&config_path, "[book]\ntotal_pages = 10\n").expect("write");

        assert!(run(&config_path, true).is_ok());
    }

    #[test]
    fn test_run_strict_fails_without_metadata() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config_path = dir.path().join("folio.toml");
        std::fs::write(&config_path, "[book]\ntotal_pages = 10\n").expect("write");

        assert!(run(&config_path, false).is_ok());
        assert!(run(&config_path, true).is_err());
    }
}
