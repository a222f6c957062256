//! Infrastructure layer - External service integrations
//!
//! This layer contains:
//! - Alloy-based ledger client and the in-memory simulator
//! - Wallet providers
//! - Connection lifecycle (provider/signer binding)

pub mod ethereum;
pub mod runtime;

pub use ethereum::{ContractGateway, LedgerClient, LedgerConnector, WalletProvider};
pub use runtime::ConnectionManager;
