//! Product records as read from the ledger

use alloy::primitives::Address;
use serde::Serialize;

/// Basic product info (`getBasicProductInfo`).
///
/// Only `id`, `producer` and `approved` carry meaning for the client; the
/// remaining fields are passed through for display and export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductRecord {
    pub id: u64,
    pub producer: Address,
    pub name: String,
    pub batch_id: String,
    pub category: String,
    pub production_date: u64,
    pub approved: bool,
    pub current_owner: Address,
}

impl ProductRecord {
    /// An entry whose producer is the zero address was never written.
    /// Such entries are holes in the registry, not empty products.
    pub fn is_vacant(&self) -> bool {
        self.producer == Address::ZERO
    }
}

/// Full product details (`getFullProductDetails`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductDetails {
    pub basic: ProductRecord,
    pub distributor: Address,
    pub retailer: Address,
    pub consumer: Address,
    pub metadata_uri: String,
    pub quality_expiry: u64,
    pub certifications: Vec<String>,
}
