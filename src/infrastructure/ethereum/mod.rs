//! Ethereum infrastructure - ledger clients, gateway and wallets

mod contract;
mod gateway;
mod ledger;
mod memory;
mod wallet;

pub use gateway::{Binding, ContractGateway, GatewayError};
pub use ledger::{
    AlloyConnector, AlloyLedger, LedgerClient, LedgerConnector, PendingTx, ProviderConfig,
    TxReceipt,
};
pub use memory::{Gate, InMemoryConnector, InMemoryLedger};
pub use wallet::{FixedWallet, LocalKeyWallet, NodeWallet, WalletProvider, WalletSigner};
