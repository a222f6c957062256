//! Export Module
//!
//! Renders scanned products as a text table, CSV or JSON.
//!
//! - Output goes to stdout, an explicit path, or a timestamped file in the
//!   default export directory
//! - Default directory: `<data dir>/exports/`

mod csv_export;
mod json_export;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use crate::domain::{short_account, ProductRecord};

pub use json_export::write_stats;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    #[default]
    Table,
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Table => "txt",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// Write `products` in `format` to `out`
pub fn write_products<W: Write>(
    out: W,
    format: ExportFormat,
    products: &[ProductRecord],
) -> Result<usize> {
    match format {
        ExportFormat::Table => write_table(out, products),
        ExportFormat::Csv => csv_export::write_products(out, products),
        ExportFormat::Json => json_export::write_products(out, products),
    }
}

/// Write `products` to `path`, creating parent directories as needed
pub fn export_products(
    path: &Path,
    format: ExportFormat,
    products: &[ProductRecord],
) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create export directory {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let count = write_products(&mut writer, format, products)?;
    writer.flush()?;
    tracing::info!(path = %path.display(), count, "products exported");
    Ok(count)
}

/// Default export directory
pub fn export_dir() -> PathBuf {
    crate::config::data_dir()
        .map(|dir| dir.join("exports"))
        .unwrap_or_else(|| PathBuf::from(".supplychain").join("exports"))
}

/// Generate a timestamped filename
pub fn generate_filename(prefix: &str, format: ExportFormat) -> String {
    let timestamp = Local::now().format("%Y-%m-%d-%H%M%S");
    format!("{}-{}.{}", prefix, timestamp, format.extension())
}

/// Default output path for a products export
pub fn default_export_path(format: ExportFormat) -> PathBuf {
    export_dir().join(generate_filename("products", format))
}

fn write_table<W: Write>(mut out: W, products: &[ProductRecord]) -> Result<usize> {
    writeln!(
        out,
        "{:>4}  {:<24} {:<12} {:<12} {:<10} {:<13} {}",
        "ID", "NAME", "BATCH", "CATEGORY", "PRODUCED", "PRODUCER", "APPROVED"
    )?;
    for product in products {
        let produced = i64::try_from(product.production_date)
            .ok()
            .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| product.production_date.to_string());
        writeln!(
            out,
            "{:>4}  {:<24} {:<12} {:<12} {:<10} {:<13} {}",
            product.id,
            truncate(&product.name, 24),
            truncate(&product.batch_id, 12),
            truncate(&product.category, 12),
            produced,
            short_account(&product.producer),
            if product.approved { "yes" } else { "no" },
        )?;
    }
    Ok(products.len())
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let mut out: String = value.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use alloy::primitives::Address;

    use super::*;

    fn sample() -> Vec<ProductRecord> {
        (1..=2)
            .map(|id| ProductRecord {
                id,
                producer: Address::repeat_byte(0xab),
                name: format!("Product {id}"),
                batch_id: format!("B-{id}"),
                category: "Produce".into(),
                production_date: 1_704_067_200,
                approved: id == 1,
                current_owner: Address::repeat_byte(0xab),
            })
            .collect()
    }

    #[test]
    fn test_export_to_nested_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("products.csv");

        let count = export_products(&path, ExportFormat::Csv, &sample()).unwrap();
        assert_eq!(count, 2);
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_table_output() {
        let mut buf = Vec::new();
        write_products(&mut buf, ExportFormat::Table, &sample()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Product 1"));
        assert!(text.contains("2024-01-01"));
        assert!(text.lines().nth(1).unwrap().ends_with("yes"));
    }

    #[test]
    fn test_generated_filename() {
        let name = generate_filename("products", ExportFormat::Json);
        assert!(name.starts_with("products-"));
        assert!(name.ends_with(".json"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}
