//! Application modules
//!
//! - registry: numbered product enumeration with per-entry fault isolation
//! - dashboard: aggregate statistics over a scan
//! - roles: fixed-precedence participant classification
//! - transactions: submission lifecycle and status reporting
//! - export: table / CSV / JSON rendering of products

pub mod dashboard;
pub mod export;
pub mod registry;
pub mod roles;
pub mod transactions;
