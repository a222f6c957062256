//! CSV Export
//!
//! Writes product records as CSV.

use std::io::Write;

use anyhow::Result;

use crate::domain::ProductRecord;

const HEADER: [&str; 8] = [
    "id",
    "name",
    "batch_id",
    "category",
    "production_date",
    "producer",
    "current_owner",
    "approved",
];

/// Write products to `out`, returns the number of rows written
pub fn write_products<W: Write>(out: W, products: &[ProductRecord]) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(out);

    wtr.write_record(HEADER)?;

    for product in products {
        wtr.write_record([
            product.id.to_string(),
            product.name.clone(),
            product.batch_id.clone(),
            product.category.clone(),
            product.production_date.to_string(),
            product.producer.to_checksum(None),
            product.current_owner.to_checksum(None),
            product.approved.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(products.len())
}
