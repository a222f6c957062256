//! Application state
//!
//! Wires the connection, scanner, dashboard, role resolver and transaction
//! orchestrator behind one façade and reports every user action on the
//! shared status banner.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::core::{StatusBanner, TxStatus, DEFAULT_STATUS_TIMEOUT};
use crate::domain::{
    parse_account, parse_product_id, short_account, Operation, ParticipantRole, ProductDetails,
    ProductRecord, SubmissionForm, ValidationError,
};
use crate::infrastructure::ethereum::{LedgerConnector, WalletProvider};
use crate::infrastructure::ConnectionManager;
use crate::modules::dashboard::{AggregationEngine, Dashboard, DashboardSnapshot, TransferPolicy};
use crate::modules::registry::{RegistryScanner, ScanReport};
use crate::modules::roles::RoleResolver;
use crate::modules::transactions::{SubmitOutcome, TransactionOrchestrator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMode {
    Mock,
    Rpc,
}

#[derive(Debug, Clone, Copy)]
pub struct AppOptions {
    pub status_timeout: Duration,
    pub scan_concurrency: usize,
    pub transfers: TransferPolicy,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            status_timeout: DEFAULT_STATUS_TIMEOUT,
            scan_concurrency: 1,
            transfers: TransferPolicy::Unavailable,
        }
    }
}

impl From<&Settings> for AppOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            status_timeout: settings.status_timeout,
            scan_concurrency: settings.scan_concurrency,
            transfers: if settings.estimate_transfers {
                TransferPolicy::LegacyEstimate
            } else {
                TransferPolicy::Unavailable
            },
        }
    }
}

pub struct App {
    pub data_mode: DataMode,
    pub products: Vec<ProductRecord>,
    pub selected_product: Option<ProductDetails>,
    pub last_scan: Option<ScanReport>,
    connection: Arc<ConnectionManager>,
    dashboard: Arc<Dashboard>,
    orchestrator: TransactionOrchestrator,
    banner: StatusBanner,
    scan_concurrency: usize,
}

impl App {
    pub async fn open(
        data_mode: DataMode,
        connector: Arc<dyn LedgerConnector>,
        wallet: Option<Arc<dyn WalletProvider>>,
        options: AppOptions,
    ) -> Result<Self> {
        let connection = Arc::new(ConnectionManager::open(connector, wallet).await?);
        let dashboard = Arc::new(Dashboard::new(
            AggregationEngine::new(options.transfers),
            options.scan_concurrency,
        ));
        let banner = StatusBanner::new(options.status_timeout);
        let orchestrator =
            TransactionOrchestrator::new(connection.clone(), dashboard.clone(), banner.clone());

        Ok(Self {
            data_mode,
            products: Vec::new(),
            selected_product: None,
            last_scan: None,
            connection,
            dashboard,
            orchestrator,
            banner,
            scan_concurrency: options.scan_concurrency,
        })
    }

    pub fn banner(&self) -> &StatusBanner {
        &self.banner
    }

    pub fn status(&self) -> TxStatus {
        self.banner.current()
    }

    pub fn on_tick(&self) {
        self.banner.on_tick();
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub async fn account(&self) -> Option<Address> {
        self.connection.account().await
    }

    pub async fn connect_wallet(&self) -> Option<Address> {
        match self.connection.connect_wallet().await {
            Ok(account) => {
                self.banner.set(TxStatus::Success(format!(
                    "Wallet connected: {}",
                    short_account(&account)
                )));
                Some(account)
            }
            Err(err) => {
                self.banner
                    .set(TxStatus::Failure(format!("Failed to connect wallet: {err:#}")));
                None
            }
        }
    }

    /// Full registry scan; replaces `products` with the readable entries.
    ///
    /// A cancelled scan returns `Ok(None)`: `products`, `last_scan` and any
    /// newer status are left as they were.
    pub async fn load_all_products(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<&ScanReport>> {
        let loading = TxStatus::Pending("Loading products...".into());
        self.banner.set_sticky(loading.clone());

        let gateway = self.connection.gateway().await;
        let scanner = RegistryScanner::new(gateway).with_concurrency(self.scan_concurrency);
        let report = match scanner.scan_all(cancel).await {
            Ok(report) => report,
            Err(err) => {
                self.banner
                    .set(TxStatus::Failure(format!("Error loading products: {err:#}")));
                return Err(err);
            }
        };

        if cancel.is_cancelled() {
            tracing::debug!(read = report.items.len(), "product load cancelled");
            self.banner.withdraw(&loading);
            return Ok(None);
        }

        self.banner.set(TxStatus::Success(report.summary()));
        self.products = report.records().cloned().collect();
        Ok(Some(&*self.last_scan.insert(report)))
    }

    /// Look up one product by id (as typed by the user)
    pub async fn search_product(&mut self, input: &str) -> Option<&ProductDetails> {
        let id = match parse_product_id(input) {
            Ok(id) => id,
            Err(err) => {
                self.banner.set(TxStatus::Failure(err.to_string()));
                return None;
            }
        };

        let gateway = self.connection.gateway().await;
        match gateway.get_full_details(id).await {
            Ok(details) => {
                self.banner.set(TxStatus::Success("Product loaded".into()));
                Some(&*self.selected_product.insert(details))
            }
            Err(err) => {
                self.selected_product = None;
                self.banner
                    .set(TxStatus::Failure(format!("Error loading product: {err:#}")));
                None
            }
        }
    }

    pub async fn update_dashboard(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<DashboardSnapshot>> {
        let gateway = self.connection.gateway().await;
        let caller = self.connection.account().await;
        self.dashboard.refresh(&gateway, caller, cancel).await
    }

    pub async fn role_for_address(&self, input: &str) -> Result<ParticipantRole, ValidationError> {
        let address = parse_account("participant", input)?;
        let resolver = RoleResolver::new(self.connection.gateway().await);
        let current = self.connection.account().await;
        Ok(resolver.resolve(address, current).await)
    }

    pub async fn submit(&self, operation: Operation, cancel: &CancellationToken) -> SubmitOutcome {
        self.orchestrator.submit(operation, cancel).await
    }

    pub async fn submit_form<F: SubmissionForm>(
        &self,
        form: &mut F,
        cancel: &CancellationToken,
    ) -> SubmitOutcome {
        self.orchestrator.submit_form(form, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RegistryRole;
    use crate::infrastructure::ethereum::{FixedWallet, InMemoryConnector, InMemoryLedger};

    async fn mock_app(ledger: &InMemoryLedger, accounts: Vec<Address>) -> App {
        let wallet: Arc<dyn WalletProvider> = Arc::new(FixedWallet::new(accounts));
        App::open(
            DataMode::Mock,
            Arc::new(InMemoryConnector::new(ledger.clone())),
            Some(wallet),
            AppOptions::default(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_connect_wallet_status() {
        let account: Address = "0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359".parse().unwrap();
        let app = mock_app(&InMemoryLedger::new(), vec![account]).await;

        assert_eq!(app.connect_wallet().await, Some(account));
        assert_eq!(
            app.status(),
            TxStatus::Success("Wallet connected: 0xfB69...d359".into())
        );
    }

    #[tokio::test]
    async fn test_connect_wallet_without_accounts() {
        let app = mock_app(&InMemoryLedger::new(), vec![]).await;
        assert_eq!(app.connect_wallet().await, None);
        assert!(matches!(
            app.status(),
            TxStatus::Failure(ref msg) if msg.starts_with("Failed to connect wallet:")
        ));
    }

    #[tokio::test]
    async fn test_load_all_products() {
        let ledger = InMemoryLedger::demo(&[]);
        ledger.revert_entry(2);
        let mut app = mock_app(&ledger, vec![]).await;

        let report = app
            .load_all_products(&CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.summary(), "Loaded 2 of 3 products (1 unreadable)");
        assert_eq!(app.products.len(), 2);
        assert_eq!(
            app.status(),
            TxStatus::Success("Loaded 2 of 3 products (1 unreadable)".into())
        );
    }

    #[tokio::test]
    async fn test_cancelled_load_keeps_previous_products() {
        let ledger = InMemoryLedger::demo(&[]);
        let mut app = mock_app(&ledger, vec![]).await;
        app.load_all_products(&CancellationToken::new())
            .await
            .unwrap();
        let loaded = app.last_scan.clone();
        let mut rx = app.banner().subscribe();

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(app.load_all_products(&cancel).await.unwrap().is_none());

        assert_eq!(app.products.len(), 3);
        assert_eq!(app.last_scan, loaded);
        assert_eq!(app.status(), TxStatus::Idle);
        let seen: Vec<TxStatus> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert!(seen.iter().all(|s| !matches!(s, TxStatus::Success(_))));
    }

    #[tokio::test]
    async fn test_load_cancelled_mid_scan_writes_nothing() {
        let ledger = InMemoryLedger::demo(&[]);
        let gate = ledger.hold_entry(2);
        let mut app = mock_app(&ledger, vec![]).await;
        let banner = app.banner().clone();
        let cancel = CancellationToken::new();

        let (loaded, ()) = tokio::join!(
            async {
                app.load_all_products(&cancel)
                    .await
                    .map(|report| report.is_some())
            },
            async {
                gate.arrived().await;
                banner.set(TxStatus::Pending("Creating product...".into()));
                cancel.cancel();
                gate.release(1);
            }
        );

        assert!(!loaded.unwrap());
        assert!(app.products.is_empty());
        assert!(app.last_scan.is_none());
        assert_eq!(
            app.status(),
            TxStatus::Pending("Creating product...".into())
        );
    }

    #[tokio::test]
    async fn test_search_product() {
        let ledger = InMemoryLedger::demo(&[]);
        let mut app = mock_app(&ledger, vec![]).await;

        let details = app.search_product("1").await.cloned().unwrap();
        assert_eq!(details.basic.name, "Arabica Coffee");
        assert_eq!(app.status(), TxStatus::Success("Product loaded".into()));

        assert!(app.search_product("42").await.is_none());
        assert!(matches!(
            app.status(),
            TxStatus::Failure(ref msg) if msg.starts_with("Error loading product:")
        ));

        let calls = ledger.call_count();
        assert!(app.search_product("abc").await.is_none());
        assert_eq!(ledger.call_count(), calls);
    }

    #[tokio::test]
    async fn test_role_for_address() {
        let me = Address::repeat_byte(0x44);
        let ledger = InMemoryLedger::demo(&[]);
        let app = mock_app(&ledger, vec![me]).await;
        app.connect_wallet().await;

        let producer = Address::repeat_byte(0x11).to_checksum(None);
        assert_eq!(
            app.role_for_address(&producer).await,
            Ok(ParticipantRole::Producer)
        );
        assert_eq!(
            app.role_for_address(&me.to_checksum(None)).await,
            Ok(ParticipantRole::SelfAccount)
        );
        assert!(app.role_for_address("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_dashboard_reflects_caller() {
        let producer = Address::repeat_byte(0x11);
        let ledger = InMemoryLedger::demo(&[producer]);
        let app = mock_app(&ledger, vec![producer]).await;
        app.connect_wallet().await;

        let snapshot = app
            .update_dashboard(&CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.stats.total_products, 3);
        assert_eq!(snapshot.stats.approved_products, 2);
        assert_eq!(snapshot.stats.owned_by_caller, 3);
        assert_eq!(snapshot.stats.registered_participants, 3);
        assert!(snapshot
            .stats
            .unavailable_counters
            .iter()
            .all(|role| *role != RegistryRole::Producer));
    }
}
