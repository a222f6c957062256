//! Wallet provider collaborators: where accounts and signers come from

use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};

/// Signer handed to the ledger connector
#[derive(Debug, Clone)]
pub enum WalletSigner {
    /// Key held by this process; transactions are signed locally
    Local(PrivateKeySigner),
    /// Account managed by the node (Anvil, Hardhat, unlocked geth)
    Node(Address),
}

impl WalletSigner {
    pub fn address(&self) -> Address {
        match self {
            WalletSigner::Local(key) => key.address(),
            WalletSigner::Node(address) => *address,
        }
    }
}

/// External wallet: request accounts, hand out a signer
#[async_trait::async_trait]
pub trait WalletProvider: Send + Sync + 'static {
    async fn request_accounts(&self) -> Result<Vec<Address>>;

    async fn signer(&self) -> Result<WalletSigner>;

    fn name(&self) -> &'static str;
}

/// Wallet backed by a private key from configuration
#[derive(Debug, Clone)]
pub struct LocalKeyWallet {
    key: PrivateKeySigner,
}

impl LocalKeyWallet {
    pub fn from_hex(key: &str) -> Result<Self> {
        let key = key
            .trim()
            .parse::<PrivateKeySigner>()
            .context("Invalid private key")?;
        Ok(Self { key })
    }
}

#[async_trait::async_trait]
impl WalletProvider for LocalKeyWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>> {
        Ok(vec![self.key.address()])
    }

    async fn signer(&self) -> Result<WalletSigner> {
        Ok(WalletSigner::Local(self.key.clone()))
    }

    fn name(&self) -> &'static str {
        "local key"
    }
}

/// Wallet that uses the first account unlocked on the node (`eth_accounts`)
#[derive(Debug, Clone)]
pub struct NodeWallet {
    rpc_url: String,
}

impl NodeWallet {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
        }
    }
}

#[async_trait::async_trait]
impl WalletProvider for NodeWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>> {
        let provider = ProviderBuilder::new()
            .connect(&self.rpc_url)
            .await
            .with_context(|| format!("Failed to connect to {}", self.rpc_url))?;
        Ok(provider.get_accounts().await?)
    }

    async fn signer(&self) -> Result<WalletSigner> {
        let accounts = self.request_accounts().await?;
        let first = accounts
            .first()
            .copied()
            .context("Node exposes no unlocked accounts")?;
        Ok(WalletSigner::Node(first))
    }

    fn name(&self) -> &'static str {
        "node accounts"
    }
}

/// Wallet with a fixed account list, used with the in-memory ledger
#[derive(Debug, Clone)]
pub struct FixedWallet {
    accounts: Vec<Address>,
}

impl FixedWallet {
    pub fn new(accounts: Vec<Address>) -> Self {
        Self { accounts }
    }
}

#[async_trait::async_trait]
impl WalletProvider for FixedWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>> {
        Ok(self.accounts.clone())
    }

    async fn signer(&self) -> Result<WalletSigner> {
        let first = self
            .accounts
            .first()
            .copied()
            .context("Wallet has no accounts")?;
        Ok(WalletSigner::Node(first))
    }

    fn name(&self) -> &'static str {
        "fixed accounts"
    }
}
