//! JSON Export
//!
//! Writes product records and dashboard statistics as pretty JSON.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use crate::domain::ProductRecord;
use crate::modules::dashboard::DashboardStats;

/// Exportable product (addresses rendered checksummed, dates as RFC 3339)
#[derive(Serialize)]
struct ExportableProduct {
    id: u64,
    name: String,
    batch_id: String,
    category: String,
    production_date: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    production_date_utc: Option<String>,
    producer: String,
    current_owner: String,
    approved: bool,
}

impl From<&ProductRecord> for ExportableProduct {
    fn from(product: &ProductRecord) -> Self {
        let production_date_utc = i64::try_from(product.production_date)
            .ok()
            .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.to_rfc3339());

        Self {
            id: product.id,
            name: product.name.clone(),
            batch_id: product.batch_id.clone(),
            category: product.category.clone(),
            production_date: product.production_date,
            production_date_utc,
            producer: product.producer.to_checksum(None),
            current_owner: product.current_owner.to_checksum(None),
            approved: product.approved,
        }
    }
}

pub fn write_products<W: Write>(mut out: W, products: &[ProductRecord]) -> Result<usize> {
    let exportable: Vec<ExportableProduct> =
        products.iter().map(ExportableProduct::from).collect();
    serde_json::to_writer_pretty(&mut out, &exportable)?;
    out.write_all(b"\n")?;
    Ok(products.len())
}

pub fn write_stats<W: Write>(mut out: W, stats: &DashboardStats) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, stats)?;
    out.write_all(b"\n")?;
    Ok(())
}
