//! Registry scan and dashboard aggregation against the in-memory ledger

use std::sync::Arc;

use alloy::primitives::Address;
use tokio_util::sync::CancellationToken;

use supplychain_client::core::TxStatus;
use supplychain_client::domain::RegistryRole;
use supplychain_client::infrastructure::ethereum::{
    ContractGateway, FixedWallet, InMemoryConnector, InMemoryLedger, WalletProvider,
};
use supplychain_client::modules::dashboard::{
    AggregationEngine, Dashboard, TransferFigure, TransferPolicy,
};
use supplychain_client::modules::registry::{RegistryScanner, ScanItem, SkipReason};
use supplychain_client::{App, AppOptions, DataMode};

fn three_products_second_reverts() -> InMemoryLedger {
    let ledger = InMemoryLedger::new();
    let farm = Address::repeat_byte(0x0f);
    ledger.seed_product(farm, "Coffee", true);
    ledger.seed_product(farm, "Honey", true);
    ledger.seed_product(farm, "Rice", false);
    ledger.revert_entry(2);
    ledger
}

#[tokio::test]
async fn test_scan_skips_reverting_entry() {
    let ledger = three_products_second_reverts();
    let scanner = RegistryScanner::new(ContractGateway::new(Arc::new(ledger)));

    let report = scanner.scan_all(&CancellationToken::new()).await.unwrap();

    let ids: Vec<u64> = report.records().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(report.requested, 3);
    let skipped: Vec<(u64, &SkipReason)> = report.skipped().collect();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].0, 2);
    assert!(matches!(report.items[1], ScanItem::Skipped { id: 2, .. }));
}

#[tokio::test]
async fn test_total_counts_registry_size_not_readable_entries() {
    let ledger = three_products_second_reverts();
    let gateway = ContractGateway::new(Arc::new(ledger));
    let dashboard = Dashboard::new(AggregationEngine::default(), 1);

    let snapshot = dashboard
        .refresh(&gateway, None, &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(snapshot.stats.total_products, 3);
    assert_eq!(snapshot.stats.readable_products, 2);
    assert_eq!(snapshot.stats.unreadable_products, 1);
    assert_eq!(snapshot.stats.approved_products, 1);
    assert_eq!(snapshot.stats.transfers, TransferFigure::Unavailable);
    assert_eq!(snapshot.scan_summary, "Loaded 2 of 3 products (1 unreadable)");
}

#[tokio::test]
async fn test_estimated_transfers_are_labelled() {
    let ledger = three_products_second_reverts();
    let gateway = ContractGateway::new(Arc::new(ledger));
    let dashboard = Dashboard::new(AggregationEngine::new(TransferPolicy::LegacyEstimate), 2);

    let snapshot = dashboard
        .refresh(&gateway, None, &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.stats.transfers, TransferFigure::Estimated(6));
    assert_eq!(snapshot.stats.transfers.to_string(), "~6 (estimate)");
}

#[tokio::test]
async fn test_failed_counter_does_not_hide_the_others() {
    let ledger = InMemoryLedger::new();
    ledger.seed_registration(RegistryRole::Producer, Address::repeat_byte(1), "Farm");
    ledger.seed_registration(RegistryRole::Distributor, Address::repeat_byte(2), "Trucks");
    ledger.seed_registration(RegistryRole::Retailer, Address::repeat_byte(3), "Shop");
    ledger.fail_total(RegistryRole::Distributor);

    let gateway = ContractGateway::new(Arc::new(ledger));
    let snapshot = Dashboard::new(AggregationEngine::default(), 1)
        .refresh(&gateway, None, &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(snapshot.stats.registered_participants, 2);
    assert_eq!(snapshot.stats.unavailable_counters, vec![RegistryRole::Distributor]);
}

#[tokio::test]
async fn test_app_loads_products_with_summary_status() {
    let ledger = three_products_second_reverts();
    let wallet: Arc<dyn WalletProvider> = Arc::new(FixedWallet::new(vec![]));
    let mut app = App::open(
        DataMode::Mock,
        Arc::new(InMemoryConnector::new(ledger)),
        Some(wallet),
        AppOptions::default(),
    )
    .await
    .unwrap();

    let report = app.load_all_products(&CancellationToken::new()).await.unwrap();
    assert!(report.is_some());
    let names: Vec<&str> = app.products.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Coffee", "Rice"]);
    assert_eq!(
        app.status(),
        TxStatus::Success("Loaded 2 of 3 products (1 unreadable)".into())
    );
}
