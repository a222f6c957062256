//! In-process simulation of the registry contract
//!
//! Backs the `--mock` data mode and the test-suite. State is shared between
//! every client handed out by the same `InMemoryLedger`, so rebinding to a
//! different signer sees the same registry. Faults can be injected per entry,
//! per predicate, per counter, and for submissions. Entry reads and
//! confirmations can be held at a [`Gate`] to observe work in flight. Every
//! trait call counts as one network call.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy::primitives::{keccak256, Address, B256};
use anyhow::{bail, Result};
use tokio::sync::Semaphore;

use crate::domain::{LedgerCall, ProductDetails, ProductRecord, RegistryRole};
use crate::infrastructure::ethereum::ledger::{
    LedgerClient, LedgerConnector, PendingTx, TxReceipt,
};
use crate::infrastructure::ethereum::wallet::WalletSigner;

#[derive(Debug)]
struct LedgerState {
    products: BTreeMap<u64, ProductDetails>,
    next_id: u64,
    registries: BTreeMap<RegistryRole, BTreeMap<Address, String>>,
    block_number: u64,
    tx_nonce: u64,
    calls: usize,
    submitted: Vec<LedgerCall>,
    reverting_entries: BTreeSet<u64>,
    failing_predicates: BTreeSet<RegistryRole>,
    failing_totals: BTreeSet<RegistryRole>,
    rejected_submissions: Option<String>,
    reverted_confirmations: Option<String>,
    held_entries: BTreeMap<u64, Gate>,
    confirm_gate: Option<Gate>,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self {
            products: BTreeMap::new(),
            next_id: 1,
            registries: BTreeMap::new(),
            block_number: 0,
            tx_nonce: 0,
            calls: 0,
            submitted: Vec::new(),
            reverting_entries: BTreeSet::new(),
            failing_predicates: BTreeSet::new(),
            failing_totals: BTreeSet::new(),
            rejected_submissions: None,
            reverted_confirmations: None,
            held_entries: BTreeMap::new(),
            confirm_gate: None,
        }
    }
}

/// Holds callers until released. Clones share the same gate.
#[derive(Debug, Clone)]
pub struct Gate {
    arrivals: Arc<Semaphore>,
    permits: Arc<Semaphore>,
}

impl Gate {
    fn new() -> Self {
        Self {
            arrivals: Arc::new(Semaphore::new(0)),
            permits: Arc::new(Semaphore::new(0)),
        }
    }

    /// Wait until one more caller is held at the gate
    pub async fn arrived(&self) {
        if let Ok(arrival) = self.arrivals.acquire().await {
            arrival.forget();
        }
    }

    /// Let `n` held callers through, in arrival order
    pub fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }

    async fn pass(&self) {
        self.arrivals.add_permits(1);
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
    }
}

/// Shared in-memory registry. Cloning shares state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<Mutex<LedgerState>>,
    sender: Option<Address>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Small registry used by `--mock`
    pub fn demo(accounts: &[Address]) -> Self {
        let ledger = Self::new();
        let producer = accounts.first().copied().unwrap_or(Address::repeat_byte(0x11));
        let inspector = accounts.get(1).copied().unwrap_or(Address::repeat_byte(0x22));
        let distributor = accounts.get(2).copied().unwrap_or(Address::repeat_byte(0x33));

        ledger.seed_registration(RegistryRole::Producer, producer, "Green Valley Farm");
        ledger.seed_registration(RegistryRole::QualityInspector, inspector, "AgriLab QA");
        ledger.seed_registration(RegistryRole::Distributor, distributor, "FastFreight");
        ledger.seed_product(producer, "Arabica Coffee", true);
        ledger.seed_product(producer, "Organic Honey", false);
        ledger.seed_product(producer, "Basmati Rice", true);
        ledger
    }

    /// A client for the same registry, sending from `sender`
    pub fn bind(&self, sender: Option<Address>) -> Self {
        Self {
            state: Arc::clone(&self.state),
            sender,
        }
    }

    pub fn seed_registration(&self, role: RegistryRole, account: Address, details: &str) {
        self.lock()
            .registries
            .entry(role)
            .or_default()
            .insert(account, details.to_string());
    }

    /// Append a product and return its id
    pub fn seed_product(&self, producer: Address, name: &str, approved: bool) -> u64 {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.products.insert(
            id,
            ProductDetails {
                basic: ProductRecord {
                    id,
                    producer,
                    name: name.to_string(),
                    batch_id: format!("BATCH-{id:03}"),
                    category: "Produce".to_string(),
                    production_date: 1_704_067_200 + id * 86_400,
                    approved,
                    current_owner: producer,
                },
                distributor: Address::ZERO,
                retailer: Address::ZERO,
                consumer: Address::ZERO,
                metadata_uri: String::new(),
                quality_expiry: 0,
                certifications: Vec::new(),
            },
        );
        id
    }

    /// Make reads of entry `id` revert
    pub fn revert_entry(&self, id: u64) {
        self.lock().reverting_entries.insert(id);
    }

    /// Make the `is{role}Registered` predicate fail
    pub fn fail_predicate(&self, role: RegistryRole) {
        self.lock().failing_predicates.insert(role);
    }

    /// Make the `total{role}s` counter fail
    pub fn fail_total(&self, role: RegistryRole) {
        self.lock().failing_totals.insert(role);
    }

    /// Reject every submission with `message` (e.g. provider unreachable)
    pub fn reject_submissions(&self, message: &str) {
        self.lock().rejected_submissions = Some(message.to_string());
    }

    /// Accept submissions but revert them on confirmation
    pub fn revert_confirmations(&self, message: &str) {
        self.lock().reverted_confirmations = Some(message.to_string());
    }

    /// Hold every read of entry `id` at the returned gate
    pub fn hold_entry(&self, id: u64) -> Gate {
        let gate = Gate::new();
        self.lock().held_entries.insert(id, gate.clone());
        gate
    }

    /// Hold the confirmation of every transaction submitted from now on at
    /// the returned gate. Transactions already submitted keep their gate.
    pub fn hold_confirmations(&self) -> Gate {
        let gate = Gate::new();
        self.lock().confirm_gate = Some(gate.clone());
        gate
    }

    /// Number of calls that reached the ledger
    pub fn call_count(&self) -> usize {
        self.lock().calls
    }

    /// Calls submitted so far, in submission order
    pub fn submitted(&self) -> Vec<LedgerCall> {
        self.lock().submitted.clone()
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn counted(&self) -> MutexGuard<'_, LedgerState> {
        let mut state = self.lock();
        state.calls += 1;
        state
    }
}

#[async_trait::async_trait]
impl LedgerClient for InMemoryLedger {
    async fn next_product_id(&self) -> Result<u64> {
        Ok(self.counted().next_id)
    }

    async fn basic_product_info(&self, id: u64) -> Result<ProductRecord> {
        let gate = self.lock().held_entries.get(&id).cloned();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        Ok(read_product(&self.counted(), id)?.basic)
    }

    async fn full_product_details(&self, id: u64) -> Result<ProductDetails> {
        read_product(&self.counted(), id)
    }

    async fn is_registered(&self, role: RegistryRole, account: Address) -> Result<bool> {
        let state = self.counted();
        if state.failing_predicates.contains(&role) {
            bail!("execution reverted: is{:?}Registered unavailable", role);
        }
        Ok(state
            .registries
            .get(&role)
            .is_some_and(|accounts| accounts.contains_key(&account)))
    }

    async fn role_total(&self, role: RegistryRole) -> Result<u64> {
        let state = self.counted();
        if state.failing_totals.contains(&role) {
            bail!("execution reverted: total{:?}s unavailable", role);
        }
        Ok(state.registries.get(&role).map_or(0, |accounts| accounts.len() as u64))
    }

    async fn submit(&self, call: LedgerCall) -> Result<Box<dyn PendingTx>> {
        let mut state = self.counted();
        if let Some(message) = &state.rejected_submissions {
            bail!("{message}");
        }
        let Some(sender) = self.sender else {
            bail!("sending a transaction requires a signer");
        };
        state.tx_nonce += 1;
        let tx_hash = keccak256(state.tx_nonce.to_be_bytes());
        state.submitted.push(call.clone());

        Ok(Box::new(MemoryPendingTx {
            state: Arc::clone(&self.state),
            call,
            sender,
            tx_hash,
            gate: state.confirm_gate.clone(),
        }))
    }

    fn sender(&self) -> Option<Address> {
        self.sender
    }

    fn endpoint_name(&self) -> String {
        "in-memory".to_string()
    }
}

fn read_product(state: &LedgerState, id: u64) -> Result<ProductDetails> {
    if state.reverting_entries.contains(&id) {
        bail!("execution reverted: product {id} unreadable");
    }
    match state.products.get(&id) {
        Some(product) => Ok(product.clone()),
        None => bail!("execution reverted: Product does not exist"),
    }
}

struct MemoryPendingTx {
    state: Arc<Mutex<LedgerState>>,
    call: LedgerCall,
    sender: Address,
    tx_hash: B256,
    gate: Option<Gate>,
}

#[async_trait::async_trait]
impl PendingTx for MemoryPendingTx {
    fn tx_hash(&self) -> B256 {
        self.tx_hash
    }

    async fn confirm(self: Box<Self>) -> Result<TxReceipt> {
        let MemoryPendingTx {
            state,
            call,
            sender,
            tx_hash,
            gate,
        } = *self;
        if let Some(gate) = gate {
            gate.pass().await;
        }
        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
        state.calls += 1;
        if let Some(message) = &state.reverted_confirmations {
            bail!("execution reverted: {message}");
        }
        apply(&mut state, call, sender)?;
        state.block_number += 1;
        Ok(TxReceipt {
            tx_hash,
            block_number: Some(state.block_number),
        })
    }
}

/// Contract rules, reduced to what the client can observe
fn apply(state: &mut LedgerState, call: LedgerCall, sender: Address) -> Result<()> {
    let registered = |state: &LedgerState, role: RegistryRole, account: Address| {
        state
            .registries
            .get(&role)
            .is_some_and(|accounts| accounts.contains_key(&account))
    };

    match call {
        LedgerCall::Register {
            role,
            account,
            details,
        } => {
            if registered(state, role, account) {
                bail!("execution reverted: {} already registered", role.label());
            }
            state
                .registries
                .entry(role)
                .or_default()
                .insert(account, details);
        }
        LedgerCall::CreateProduct {
            name,
            batch_id,
            category,
            production_date,
            metadata_uri,
        } => {
            if !registered(state, RegistryRole::Producer, sender) {
                bail!("execution reverted: Only registered producers");
            }
            let id = state.next_id;
            state.next_id += 1;
            state.products.insert(
                id,
                ProductDetails {
                    basic: ProductRecord {
                        id,
                        producer: sender,
                        name,
                        batch_id,
                        category,
                        production_date,
                        approved: false,
                        current_owner: sender,
                    },
                    distributor: Address::ZERO,
                    retailer: Address::ZERO,
                    consumer: Address::ZERO,
                    metadata_uri,
                    quality_expiry: 0,
                    certifications: Vec::new(),
                },
            );
        }
        LedgerCall::AssignDistributor {
            product_id,
            distributor,
        } => {
            if !registered(state, RegistryRole::Distributor, distributor) {
                bail!("execution reverted: Distributor not registered");
            }
            let product = product_mut(state, product_id)?;
            product.distributor = distributor;
            product.basic.current_owner = distributor;
        }
        LedgerCall::AssignRetailer {
            product_id,
            retailer,
        } => {
            if !registered(state, RegistryRole::Retailer, retailer) {
                bail!("execution reverted: Retailer not registered");
            }
            let product = product_mut(state, product_id)?;
            product.retailer = retailer;
            product.basic.current_owner = retailer;
        }
        LedgerCall::AddCertification {
            product_id,
            certification,
        } => {
            product_mut(state, product_id)?
                .certifications
                .push(certification);
        }
        LedgerCall::ApproveQuality {
            product_id,
            expiry_date,
        } => {
            if !registered(state, RegistryRole::QualityInspector, sender) {
                bail!("execution reverted: Only quality inspectors");
            }
            let product = product_mut(state, product_id)?;
            product.basic.approved = true;
            product.quality_expiry = expiry_date;
        }
        LedgerCall::SellToConsumer {
            product_id,
            consumer,
        } => {
            let product = product_mut(state, product_id)?;
            product.consumer = consumer;
            product.basic.current_owner = consumer;
        }
    }
    Ok(())
}

fn product_mut(state: &mut LedgerState, id: u64) -> Result<&mut ProductDetails> {
    match state.products.get_mut(&id) {
        Some(product) => Ok(product),
        None => bail!("execution reverted: Product does not exist"),
    }
}

/// Hands out clients of one shared `InMemoryLedger`
#[derive(Debug, Clone)]
pub struct InMemoryConnector {
    ledger: InMemoryLedger,
}

impl InMemoryConnector {
    pub fn new(ledger: InMemoryLedger) -> Self {
        Self { ledger }
    }
}

#[async_trait::async_trait]
impl LedgerConnector for InMemoryConnector {
    async fn connect(&self, signer: Option<WalletSigner>) -> Result<Arc<dyn LedgerClient>> {
        let sender = signer.map(|signer| signer.address());
        Ok(Arc::new(self.ledger.bind(sender)))
    }

    fn endpoint_name(&self) -> String {
        "in-memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[tokio::test]
    async fn test_reads_and_faults() {
        let ledger = InMemoryLedger::new();
        ledger.seed_product(addr(1), "A", true);
        ledger.seed_product(addr(1), "B", false);
        ledger.revert_entry(2);

        assert_eq!(ledger.next_product_id().await.unwrap(), 3);
        assert!(ledger.basic_product_info(1).await.unwrap().approved);
        assert!(ledger.basic_product_info(2).await.is_err());
        assert!(ledger.basic_product_info(9).await.is_err());
        assert_eq!(ledger.call_count(), 4);
    }

    #[tokio::test]
    async fn test_submission_applies_on_confirm() {
        let ledger = InMemoryLedger::new();
        let client = ledger.bind(Some(addr(7)));

        let pending = client
            .submit(LedgerCall::Register {
                role: RegistryRole::Producer,
                account: addr(7),
                details: "Farm".into(),
            })
            .await
            .unwrap();
        assert!(!ledger.is_registered(RegistryRole::Producer, addr(7)).await.unwrap());

        let receipt = pending.confirm().await.unwrap();
        assert_eq!(receipt.block_number, Some(1));
        assert!(ledger.is_registered(RegistryRole::Producer, addr(7)).await.unwrap());
        assert_eq!(ledger.role_total(RegistryRole::Producer).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_contract_rules() {
        let ledger = InMemoryLedger::new();
        let client = ledger.bind(Some(addr(7)));
        let create = LedgerCall::CreateProduct {
            name: "Tea".into(),
            batch_id: "T-1".into(),
            category: "Leaves".into(),
            production_date: 1,
            metadata_uri: String::new(),
        };

        let pending = client.submit(create.clone()).await.unwrap();
        let err = pending.confirm().await.unwrap_err();
        assert!(err.to_string().contains("Only registered producers"));

        ledger.seed_registration(RegistryRole::Producer, addr(7), "Farm");
        client.submit(create).await.unwrap().confirm().await.unwrap();
        let record = ledger.basic_product_info(1).await.unwrap();
        assert_eq!(record.producer, addr(7));
        assert!(!record.approved);
    }

    #[tokio::test]
    async fn test_held_confirmation_applies_after_release() {
        let ledger = InMemoryLedger::new();
        let client = ledger.bind(Some(addr(7)));
        let gate = ledger.hold_confirmations();

        let pending = client
            .submit(LedgerCall::Register {
                role: RegistryRole::Retailer,
                account: addr(7),
                details: "Shop".into(),
            })
            .await
            .unwrap();
        let (receipt, registered_while_held) = tokio::join!(pending.confirm(), async {
            gate.arrived().await;
            let registered = ledger.is_registered(RegistryRole::Retailer, addr(7)).await;
            gate.release(1);
            registered.unwrap()
        });

        assert!(!registered_while_held);
        assert!(receipt.is_ok());
        assert!(ledger.is_registered(RegistryRole::Retailer, addr(7)).await.unwrap());
    }

    #[tokio::test]
    async fn test_read_only_client_cannot_submit() {
        let ledger = InMemoryLedger::new();
        let result = ledger
            .submit(LedgerCall::AddCertification {
                product_id: 1,
                certification: "ISO".into(),
            })
            .await;
        assert!(result.is_err());
    }
}
