//! Provider/signer lifecycle
//!
//! Starts read-only. Connecting a wallet requests its accounts, takes its
//! signer and rebuilds the gateway through the connector; disconnecting
//! rebuilds a read-only gateway.

use std::sync::Arc;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use tokio::sync::RwLock;

use crate::infrastructure::ethereum::{ContractGateway, LedgerConnector, WalletProvider};

struct ConnectionState {
    gateway: ContractGateway,
    account: Option<Address>,
}

pub struct ConnectionManager {
    connector: Arc<dyn LedgerConnector>,
    wallet: Option<Arc<dyn WalletProvider>>,
    state: RwLock<ConnectionState>,
}

impl ConnectionManager {
    /// Connect a read-only gateway
    pub async fn open(
        connector: Arc<dyn LedgerConnector>,
        wallet: Option<Arc<dyn WalletProvider>>,
    ) -> Result<Self> {
        let client = connector
            .connect(None)
            .await
            .with_context(|| format!("Connection failed ({})", connector.endpoint_name()))?;
        tracing::info!(endpoint = %client.endpoint_name(), "connected read-only");

        Ok(Self {
            connector,
            wallet,
            state: RwLock::new(ConnectionState {
                gateway: ContractGateway::new(client),
                account: None,
            }),
        })
    }

    /// Request accounts from the wallet and rebind the gateway to its signer
    pub async fn connect_wallet(&self) -> Result<Address> {
        let wallet = self
            .wallet
            .as_ref()
            .context("No wallet configured")?;

        let accounts = wallet.request_accounts().await?;
        tracing::debug!(wallet = wallet.name(), count = accounts.len(), "accounts received");

        let signer = wallet.signer().await?;
        let account = signer.address();
        let client = self.connector.connect(Some(signer)).await?;

        let mut state = self.state.write().await;
        state.gateway = ContractGateway::new(client);
        state.account = Some(account);
        tracing::info!(%account, wallet = wallet.name(), "wallet connected");
        Ok(account)
    }

    /// Drop the signer and fall back to a read-only binding
    pub async fn disconnect(&self) -> Result<()> {
        let client = self.connector.connect(None).await?;
        let mut state = self.state.write().await;
        state.gateway = ContractGateway::new(client);
        state.account = None;
        Ok(())
    }

    /// Current gateway. Cheap to clone; a later rebind does not affect it.
    pub async fn gateway(&self) -> ContractGateway {
        self.state.read().await.gateway.clone()
    }

    pub async fn account(&self) -> Option<Address> {
        self.state.read().await.account
    }

    pub fn has_wallet(&self) -> bool {
        self.wallet.is_some()
    }

    pub fn endpoint_name(&self) -> String {
        self.connector.endpoint_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ethereum::{Binding, FixedWallet, InMemoryConnector, InMemoryLedger};

    #[tokio::test]
    async fn test_connect_rebuilds_binding() {
        let account = Address::repeat_byte(0x42);
        let connector = Arc::new(InMemoryConnector::new(InMemoryLedger::new()));
        let wallet: Arc<dyn WalletProvider> = Arc::new(FixedWallet::new(vec![account]));
        let manager = ConnectionManager::open(connector, Some(wallet)).await.unwrap();

        let before = manager.gateway().await;
        assert_eq!(before.binding(), Binding::ReadOnly);
        assert_eq!(manager.account().await, None);

        assert_eq!(manager.connect_wallet().await.unwrap(), account);
        assert_eq!(manager.gateway().await.binding(), Binding::Signed(account));
        assert_eq!(before.binding(), Binding::ReadOnly);

        manager.disconnect().await.unwrap();
        assert_eq!(manager.gateway().await.binding(), Binding::ReadOnly);
        assert_eq!(manager.account().await, None);
    }

    #[tokio::test]
    async fn test_connect_without_wallet_fails() {
        let connector = Arc::new(InMemoryConnector::new(InMemoryLedger::new()));
        let manager = ConnectionManager::open(connector, None).await.unwrap();
        assert!(manager.connect_wallet().await.is_err());
        assert!(!manager.has_wallet());
    }
}
