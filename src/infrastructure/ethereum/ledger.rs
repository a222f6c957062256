//! Ledger client abstraction and the Alloy JSON-RPC implementation
//!
//! The ledger contract is an external collaborator with a fixed interface.
//! `LedgerClient` is that interface as the rest of the crate sees it;
//! `LedgerConnector` builds a client for a given signer, so that switching
//! signer rebuilds the binding.

use std::sync::Arc;

use alloy::network::{Ethereum, EthereumWallet, ReceiptResponse};
use alloy::primitives::{Address, B256, U256};
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder};
use anyhow::{anyhow, bail, Context, Result};

use crate::domain::{LedgerCall, ProductDetails, ProductRecord, RegistryRole};
use crate::infrastructure::ethereum::contract::SupplyChain;
use crate::infrastructure::ethereum::wallet::WalletSigner;

/// Confirmed transaction summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
}

/// Handle to a submitted transaction
#[async_trait::async_trait]
pub trait PendingTx: Send {
    fn tx_hash(&self) -> B256;

    /// Wait until the transaction is mined. Fails if it reverted.
    async fn confirm(self: Box<Self>) -> Result<TxReceipt>;
}

/// Operations of the supply-chain registry contract
#[async_trait::async_trait]
pub trait LedgerClient: Send + Sync + 'static {
    /// `nextProductId()`: ids `1..next` have been assigned
    async fn next_product_id(&self) -> Result<u64>;

    /// `getBasicProductInfo(id)`
    async fn basic_product_info(&self, id: u64) -> Result<ProductRecord>;

    /// `getFullProductDetails(id)`
    async fn full_product_details(&self, id: u64) -> Result<ProductDetails>;

    /// `is{Role}Registered(account)`
    async fn is_registered(&self, role: RegistryRole, account: Address) -> Result<bool>;

    /// `total{Role}s()`
    async fn role_total(&self, role: RegistryRole) -> Result<u64>;

    /// Send a state-mutating transaction
    async fn submit(&self, call: LedgerCall) -> Result<Box<dyn PendingTx>>;

    /// Account transactions are sent from, if a signer is bound
    fn sender(&self) -> Option<Address>;

    /// Get endpoint display name
    fn endpoint_name(&self) -> String;
}

/// Builds ledger clients bound to an optional signer
#[async_trait::async_trait]
pub trait LedgerConnector: Send + Sync + 'static {
    async fn connect(&self, signer: Option<WalletSigner>) -> Result<Arc<dyn LedgerClient>>;

    fn endpoint_name(&self) -> String;
}

/// Provider configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderConfig {
    /// HTTP JSON-RPC endpoint
    Http(String),
    /// WebSocket endpoint
    WebSocket(String),
}

impl ProviderConfig {
    pub fn from_url(url: &str) -> Result<Self> {
        let url = url.trim();
        let lower = url.to_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(ProviderConfig::Http(url.to_string()))
        } else if lower.starts_with("ws://") || lower.starts_with("wss://") {
            Ok(ProviderConfig::WebSocket(url.to_string()))
        } else {
            bail!("Unsupported RPC endpoint (expected http(s):// or ws(s)://): {url}")
        }
    }

    /// Get display name for this endpoint
    pub fn display(&self) -> String {
        match self {
            ProviderConfig::Http(url) | ProviderConfig::WebSocket(url) => url.clone(),
        }
    }

    /// Check if this is a WebSocket endpoint
    pub fn is_websocket(&self) -> bool {
        matches!(self, ProviderConfig::WebSocket(_))
    }
}

/// Connects `AlloyLedger` clients to a JSON-RPC endpoint
#[derive(Debug, Clone)]
pub struct AlloyConnector {
    endpoint: ProviderConfig,
    contract: Address,
}

impl AlloyConnector {
    pub fn new(endpoint: ProviderConfig, contract: Address) -> Self {
        Self { endpoint, contract }
    }

    async fn dial(&self, wallet: Option<EthereumWallet>) -> Result<DynProvider> {
        let url = self.endpoint.display();
        let provider = match wallet {
            Some(wallet) => ProviderBuilder::new()
                .wallet(wallet)
                .connect(&url)
                .await
                .with_context(|| format!("Failed to connect to {url}"))?
                .erased(),
            None => ProviderBuilder::new()
                .connect(&url)
                .await
                .with_context(|| format!("Failed to connect to {url}"))?
                .erased(),
        };
        Ok(provider)
    }
}

#[async_trait::async_trait]
impl LedgerConnector for AlloyConnector {
    async fn connect(&self, signer: Option<WalletSigner>) -> Result<Arc<dyn LedgerClient>> {
        let (provider, sender) = match signer {
            Some(WalletSigner::Local(key)) => {
                let from = key.address();
                (self.dial(Some(EthereumWallet::from(key))).await?, Some(from))
            }
            // Node-managed account: the node signs `eth_sendTransaction`
            Some(WalletSigner::Node(from)) => (self.dial(None).await?, Some(from)),
            None => (self.dial(None).await?, None),
        };

        Ok(Arc::new(AlloyLedger {
            contract: SupplyChain::new(self.contract, provider),
            sender,
            endpoint: self.endpoint.display(),
        }))
    }

    fn endpoint_name(&self) -> String {
        self.endpoint.display()
    }
}

/// Ledger client backed by `sol!` bindings over an Alloy provider
pub struct AlloyLedger {
    contract: SupplyChain::SupplyChainInstance<DynProvider>,
    sender: Option<Address>,
    endpoint: String,
}

// Applies the bound sender and sends; every mutating call builder has a
// distinct type, so this is a macro rather than a function.
macro_rules! send_call {
    ($self:ident, $builder:expr) => {{
        let builder = $builder;
        let builder = match $self.sender {
            Some(from) => builder.from(from),
            None => builder,
        };
        let pending = builder.send().await?;
        Box::new(AlloyPendingTx { inner: pending }) as Box<dyn PendingTx>
    }};
}

#[async_trait::async_trait]
impl LedgerClient for AlloyLedger {
    async fn next_product_id(&self) -> Result<u64> {
        let next = self.contract.nextProductId().call().await?;
        to_u64(next, "nextProductId")
    }

    async fn basic_product_info(&self, id: u64) -> Result<ProductRecord> {
        let info = self
            .contract
            .getBasicProductInfo(U256::from(id))
            .call()
            .await?;
        Ok(ProductRecord {
            id,
            producer: info.producer,
            name: info.name,
            batch_id: info.batchId,
            category: info.category,
            production_date: to_u64(info.productionDate, "productionDate")?,
            approved: info.isQualityApproved,
            current_owner: info.currentOwner,
        })
    }

    async fn full_product_details(&self, id: u64) -> Result<ProductDetails> {
        let info = self
            .contract
            .getFullProductDetails(U256::from(id))
            .call()
            .await?;
        Ok(ProductDetails {
            basic: ProductRecord {
                id,
                producer: info.producer,
                name: info.name,
                batch_id: info.batchId,
                category: info.category,
                production_date: to_u64(info.productionDate, "productionDate")?,
                approved: info.isQualityApproved,
                current_owner: info.currentOwner,
            },
            distributor: info.distributor,
            retailer: info.retailer,
            consumer: info.consumer,
            metadata_uri: info.metadataURI,
            quality_expiry: to_u64(info.qualityExpiryDate, "qualityExpiryDate")?,
            certifications: info.certifications,
        })
    }

    async fn is_registered(&self, role: RegistryRole, account: Address) -> Result<bool> {
        let registered = match role {
            RegistryRole::Producer => self.contract.isProducerRegistered(account).call().await?,
            RegistryRole::QualityInspector => {
                self.contract
                    .isQualityInspectorRegistered(account)
                    .call()
                    .await?
            }
            RegistryRole::Distributor => {
                self.contract.isDistributorRegistered(account).call().await?
            }
            RegistryRole::Retailer => self.contract.isRetailerRegistered(account).call().await?,
        };
        Ok(registered)
    }

    async fn role_total(&self, role: RegistryRole) -> Result<u64> {
        let total = match role {
            RegistryRole::Producer => self.contract.totalProducers().call().await?,
            RegistryRole::QualityInspector => {
                self.contract.totalQualityInspectors().call().await?
            }
            RegistryRole::Distributor => self.contract.totalDistributors().call().await?,
            RegistryRole::Retailer => self.contract.totalRetailers().call().await?,
        };
        to_u64(total, "role total")
    }

    async fn submit(&self, call: LedgerCall) -> Result<Box<dyn PendingTx>> {
        let pending = match call {
            LedgerCall::Register {
                role,
                account,
                details,
            } => match role {
                RegistryRole::Producer => {
                    send_call!(self, self.contract.registerProducer(account, details))
                }
                RegistryRole::QualityInspector => {
                    send_call!(self, self.contract.registerQualityInspector(account, details))
                }
                RegistryRole::Distributor => {
                    send_call!(self, self.contract.registerDistributor(account, details))
                }
                RegistryRole::Retailer => {
                    send_call!(self, self.contract.registerRetailer(account, details))
                }
            },
            LedgerCall::CreateProduct {
                name,
                batch_id,
                category,
                production_date,
                metadata_uri,
            } => send_call!(
                self,
                self.contract.createProduct(
                    name,
                    batch_id,
                    category,
                    U256::from(production_date),
                    metadata_uri,
                )
            ),
            LedgerCall::AssignDistributor {
                product_id,
                distributor,
            } => send_call!(
                self,
                self.contract
                    .assignDistributor(U256::from(product_id), distributor)
            ),
            LedgerCall::AssignRetailer {
                product_id,
                retailer,
            } => send_call!(
                self,
                self.contract.assignRetailer(U256::from(product_id), retailer)
            ),
            LedgerCall::AddCertification {
                product_id,
                certification,
            } => send_call!(
                self,
                self.contract
                    .addCertification(U256::from(product_id), certification)
            ),
            LedgerCall::ApproveQuality {
                product_id,
                expiry_date,
            } => send_call!(
                self,
                self.contract
                    .approveQuality(U256::from(product_id), U256::from(expiry_date))
            ),
            LedgerCall::SellToConsumer {
                product_id,
                consumer,
            } => send_call!(
                self,
                self.contract.sellToConsumer(U256::from(product_id), consumer)
            ),
        };
        Ok(pending)
    }

    fn sender(&self) -> Option<Address> {
        self.sender
    }

    fn endpoint_name(&self) -> String {
        self.endpoint.clone()
    }
}

struct AlloyPendingTx {
    inner: PendingTransactionBuilder<Ethereum>,
}

#[async_trait::async_trait]
impl PendingTx for AlloyPendingTx {
    fn tx_hash(&self) -> B256 {
        *self.inner.tx_hash()
    }

    async fn confirm(self: Box<Self>) -> Result<TxReceipt> {
        let receipt = self
            .inner
            .get_receipt()
            .await
            .context("Failed to confirm transaction")?;
        let tx_hash = ReceiptResponse::transaction_hash(&receipt);
        if !ReceiptResponse::status(&receipt) {
            bail!("Transaction {tx_hash} reverted");
        }
        Ok(TxReceipt {
            tx_hash,
            block_number: ReceiptResponse::block_number(&receipt),
        })
    }
}

fn to_u64(value: U256, what: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{what} out of range: {value}"))
}
