//! Typed façade over the ledger client
//!
//! The gateway carries the binding mode: read-only when no signer is active,
//! signed otherwise. Mutating calls on a read-only binding are refused before
//! anything is sent.

use std::sync::Arc;

use alloy::primitives::Address;
use anyhow::Result;
use thiserror::Error;

use crate::domain::{LedgerCall, ProductDetails, ProductRecord, RegistryRole};
use crate::infrastructure::ethereum::ledger::{LedgerClient, PendingTx};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    ReadOnly,
    Signed(Address),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("Connect wallet first")]
    ReadOnlyBinding,
}

#[derive(Clone)]
pub struct ContractGateway {
    client: Arc<dyn LedgerClient>,
    binding: Binding,
}

impl std::fmt::Debug for ContractGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractGateway")
            .field("endpoint", &self.client.endpoint_name())
            .field("binding", &self.binding)
            .finish()
    }
}

impl ContractGateway {
    pub fn new(client: Arc<dyn LedgerClient>) -> Self {
        let binding = match client.sender() {
            Some(account) => Binding::Signed(account),
            None => Binding::ReadOnly,
        };
        Self { client, binding }
    }

    pub fn binding(&self) -> Binding {
        self.binding
    }

    pub fn is_signed(&self) -> bool {
        matches!(self.binding, Binding::Signed(_))
    }

    pub fn endpoint_name(&self) -> String {
        self.client.endpoint_name()
    }

    // === Reads ===

    pub async fn next_product_id(&self) -> Result<u64> {
        self.client.next_product_id().await
    }

    pub async fn get_basic_info(&self, id: u64) -> Result<ProductRecord> {
        self.client.basic_product_info(id).await
    }

    pub async fn get_full_details(&self, id: u64) -> Result<ProductDetails> {
        self.client.full_product_details(id).await
    }

    pub async fn is_registered(&self, role: RegistryRole, account: Address) -> Result<bool> {
        self.client.is_registered(role, account).await
    }

    pub async fn is_producer_registered(&self, account: Address) -> Result<bool> {
        self.is_registered(RegistryRole::Producer, account).await
    }

    pub async fn is_quality_inspector_registered(&self, account: Address) -> Result<bool> {
        self.is_registered(RegistryRole::QualityInspector, account).await
    }

    pub async fn is_distributor_registered(&self, account: Address) -> Result<bool> {
        self.is_registered(RegistryRole::Distributor, account).await
    }

    pub async fn is_retailer_registered(&self, account: Address) -> Result<bool> {
        self.is_registered(RegistryRole::Retailer, account).await
    }

    pub async fn role_total(&self, role: RegistryRole) -> Result<u64> {
        self.client.role_total(role).await
    }

    pub async fn total_producers(&self) -> Result<u64> {
        self.role_total(RegistryRole::Producer).await
    }

    pub async fn total_quality_inspectors(&self) -> Result<u64> {
        self.role_total(RegistryRole::QualityInspector).await
    }

    pub async fn total_distributors(&self) -> Result<u64> {
        self.role_total(RegistryRole::Distributor).await
    }

    pub async fn total_retailers(&self) -> Result<u64> {
        self.role_total(RegistryRole::Retailer).await
    }

    // === Writes ===

    /// Dispatch a validated call. Requires a signed binding.
    pub async fn submit(&self, call: LedgerCall) -> Result<Box<dyn PendingTx>> {
        if !self.is_signed() {
            return Err(GatewayError::ReadOnlyBinding.into());
        }
        self.client.submit(call).await
    }

    pub async fn register(
        &self,
        role: RegistryRole,
        account: Address,
        details: impl Into<String>,
    ) -> Result<Box<dyn PendingTx>> {
        self.submit(LedgerCall::Register {
            role,
            account,
            details: details.into(),
        })
        .await
    }

    pub async fn register_producer(
        &self,
        account: Address,
        details: impl Into<String>,
    ) -> Result<Box<dyn PendingTx>> {
        self.register(RegistryRole::Producer, account, details).await
    }

    pub async fn register_quality_inspector(
        &self,
        account: Address,
        details: impl Into<String>,
    ) -> Result<Box<dyn PendingTx>> {
        self.register(RegistryRole::QualityInspector, account, details)
            .await
    }

    pub async fn register_distributor(
        &self,
        account: Address,
        details: impl Into<String>,
    ) -> Result<Box<dyn PendingTx>> {
        self.register(RegistryRole::Distributor, account, details)
            .await
    }

    pub async fn register_retailer(
        &self,
        account: Address,
        details: impl Into<String>,
    ) -> Result<Box<dyn PendingTx>> {
        self.register(RegistryRole::Retailer, account, details).await
    }

    pub async fn create_product(
        &self,
        name: impl Into<String>,
        batch_id: impl Into<String>,
        category: impl Into<String>,
        production_date: u64,
        metadata_uri: impl Into<String>,
    ) -> Result<Box<dyn PendingTx>> {
        self.submit(LedgerCall::CreateProduct {
            name: name.into(),
            batch_id: batch_id.into(),
            category: category.into(),
            production_date,
            metadata_uri: metadata_uri.into(),
        })
        .await
    }

    pub async fn assign_distributor(
        &self,
        product_id: u64,
        distributor: Address,
    ) -> Result<Box<dyn PendingTx>> {
        self.submit(LedgerCall::AssignDistributor {
            product_id,
            distributor,
        })
        .await
    }

    pub async fn assign_retailer(
        &self,
        product_id: u64,
        retailer: Address,
    ) -> Result<Box<dyn PendingTx>> {
        self.submit(LedgerCall::AssignRetailer {
            product_id,
            retailer,
        })
        .await
    }

    pub async fn add_certification(
        &self,
        product_id: u64,
        certification: impl Into<String>,
    ) -> Result<Box<dyn PendingTx>> {
        self.submit(LedgerCall::AddCertification {
            product_id,
            certification: certification.into(),
        })
        .await
    }

    pub async fn approve_quality(
        &self,
        product_id: u64,
        expiry_date: u64,
    ) -> Result<Box<dyn PendingTx>> {
        self.submit(LedgerCall::ApproveQuality {
            product_id,
            expiry_date,
        })
        .await
    }

    pub async fn sell_to_consumer(
        &self,
        product_id: u64,
        consumer: Address,
    ) -> Result<Box<dyn PendingTx>> {
        self.submit(LedgerCall::SellToConsumer {
            product_id,
            consumer,
        })
        .await
    }
}
