//! Client core for a supply-chain registry contract.
//!
//! Enumerates products, aggregates dashboard statistics, resolves
//! participant roles and drives state-changing transactions with a typed,
//! expiring status.

pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod infrastructure;
pub mod modules;

pub use app::{App, AppOptions, DataMode};
