//! Dashboard statistics
//!
//! `AggregationEngine::compute` is pure over a scan report and role
//! counters. `Dashboard::refresh` gathers those inputs (re-scan + counters)
//! and publishes the latest snapshot.

use alloy::primitives::Address;
use anyhow::Result;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::domain::{ProductRecord, RegistryRole};
use crate::infrastructure::ethereum::ContractGateway;
use crate::modules::registry::{RegistryScanner, ScanReport};

/// The four registry counters. `None` marks a counter that failed to read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoleCounters {
    pub producers: Option<u64>,
    pub quality_inspectors: Option<u64>,
    pub distributors: Option<u64>,
    pub retailers: Option<u64>,
}

impl RoleCounters {
    /// Read each counter independently; a failure only affects its own slot
    pub async fn fetch(gateway: &ContractGateway) -> Self {
        let mut counters = Self::default();
        for role in RegistryRole::ALL {
            let value = match gateway.role_total(role).await {
                Ok(total) => Some(total),
                Err(err) => {
                    tracing::warn!(role = %role, error = %format!("{err:#}"), "role counter unavailable");
                    None
                }
            };
            *counters.slot_mut(role) = value;
        }
        counters
    }

    pub fn get(&self, role: RegistryRole) -> Option<u64> {
        match role {
            RegistryRole::Producer => self.producers,
            RegistryRole::QualityInspector => self.quality_inspectors,
            RegistryRole::Distributor => self.distributors,
            RegistryRole::Retailer => self.retailers,
        }
    }

    /// Sum of all counters, unreadable ones counted as 0
    pub fn registered_participants(&self) -> u64 {
        RegistryRole::ALL
            .iter()
            .map(|role| self.get(*role).unwrap_or(0))
            .sum()
    }

    pub fn unavailable(&self) -> Vec<RegistryRole> {
        RegistryRole::ALL
            .into_iter()
            .filter(|role| self.get(*role).is_none())
            .collect()
    }

    fn slot_mut(&mut self, role: RegistryRole) -> &mut Option<u64> {
        match role {
            RegistryRole::Producer => &mut self.producers,
            RegistryRole::QualityInspector => &mut self.quality_inspectors,
            RegistryRole::Distributor => &mut self.distributors,
            RegistryRole::Retailer => &mut self.retailers,
        }
    }
}

/// How transfers are reported. The ledger exposes no transfer counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransferPolicy {
    #[default]
    Unavailable,
    /// Legacy heuristic: two transfers per product
    LegacyEstimate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value")]
pub enum TransferFigure {
    Unavailable,
    /// Heuristic, not a count read from the ledger
    Estimated(u64),
}

impl std::fmt::Display for TransferFigure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferFigure::Unavailable => f.write_str("n/a"),
            TransferFigure::Estimated(n) => write!(f, "~{n} (estimate)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    /// Registry size, `nextProductId - 1`; unaffected by unreadable entries
    pub total_products: u64,
    pub readable_products: u64,
    pub unreadable_products: u64,
    pub approved_products: u64,
    pub owned_by_caller: u64,
    pub registered_participants: u64,
    pub unavailable_counters: Vec<RegistryRole>,
    pub transfers: TransferFigure,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AggregationEngine {
    transfers: TransferPolicy,
}

impl AggregationEngine {
    pub fn new(transfers: TransferPolicy) -> Self {
        Self { transfers }
    }

    pub fn compute(
        &self,
        report: &ScanReport,
        caller: Option<Address>,
        counters: &RoleCounters,
    ) -> DashboardStats {
        let total_products = report.requested;
        let approved_products = report.records().filter(|r| r.approved).count() as u64;
        let owned_by_caller = match caller {
            Some(caller) => report.records().filter(|r| r.producer == caller).count() as u64,
            None => 0,
        };

        let transfers = match self.transfers {
            TransferPolicy::Unavailable => TransferFigure::Unavailable,
            TransferPolicy::LegacyEstimate => {
                TransferFigure::Estimated(if total_products > 0 { total_products * 2 } else { 0 })
            }
        };

        DashboardStats {
            total_products,
            readable_products: report.readable_count(),
            unreadable_products: report.unreadable_count(),
            approved_products,
            owned_by_caller,
            registered_participants: counters.registered_participants(),
            unavailable_counters: counters.unavailable(),
            transfers,
        }
    }
}

/// Latest refresh result
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub stats: DashboardStats,
    pub products: Vec<ProductRecord>,
    pub scan_summary: String,
}

/// Re-scans and re-aggregates on demand, keeping the latest snapshot
pub struct Dashboard {
    engine: AggregationEngine,
    scan_concurrency: usize,
    latest: watch::Sender<Option<DashboardSnapshot>>,
}

impl Dashboard {
    pub fn new(engine: AggregationEngine, scan_concurrency: usize) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            engine,
            scan_concurrency,
            latest,
        }
    }

    pub fn latest(&self) -> Option<DashboardSnapshot> {
        self.latest.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<DashboardSnapshot>> {
        self.latest.subscribe()
    }

    /// Re-scan the registry, re-read the counters and re-aggregate.
    ///
    /// A cancelled refresh returns `Ok(None)` and leaves the published
    /// snapshot untouched.
    pub async fn refresh(
        &self,
        gateway: &ContractGateway,
        caller: Option<Address>,
        cancel: &CancellationToken,
    ) -> Result<Option<DashboardSnapshot>> {
        let scanner = RegistryScanner::new(gateway.clone()).with_concurrency(self.scan_concurrency);
        let report = scanner.scan_all(cancel).await?;
        if cancel.is_cancelled() {
            return Ok(None);
        }

        let counters = RoleCounters::fetch(gateway).await;
        if cancel.is_cancelled() {
            return Ok(None);
        }

        let snapshot = DashboardSnapshot {
            stats: self.engine.compute(&report, caller, &counters),
            products: report.records().cloned().collect(),
            scan_summary: report.summary(),
        };
        self.latest.send_replace(Some(snapshot.clone()));
        Ok(Some(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::infrastructure::ethereum::InMemoryLedger;
    use crate::modules::registry::{ScanItem, SkipReason};

    fn record(id: u64, producer: u8, approved: bool) -> ScanItem {
        ScanItem::Read(ProductRecord {
            id,
            producer: Address::repeat_byte(producer),
            name: format!("p{id}"),
            batch_id: String::new(),
            category: String::new(),
            production_date: 0,
            approved,
            current_owner: Address::repeat_byte(producer),
        })
    }

    #[test]
    fn test_approved_count_independent_of_order() {
        let items = vec![
            record(1, 1, true),
            record(2, 2, false),
            record(3, 1, true),
            record(4, 3, false),
            record(5, 1, true),
        ];
        let mut reversed = items.clone();
        reversed.reverse();
        let mut rotated = items.clone();
        rotated.rotate_left(2);

        let engine = AggregationEngine::default();
        for items in [items, reversed, rotated] {
            let report = ScanReport::from_items(5, items);
            let stats = engine.compute(&report, None, &RoleCounters::default());
            assert_eq!(stats.approved_products, 3);
            assert_eq!(stats.readable_products, 5);
        }
    }

    #[test]
    fn test_holes_are_unknown_not_owned() {
        let report = ScanReport::from_items(
            3,
            vec![
                record(1, 1, true),
                ScanItem::Skipped {
                    id: 2,
                    reason: SkipReason::CallFailed("reverted".into()),
                },
                record(3, 1, false),
            ],
        );
        let stats = AggregationEngine::default().compute(
            &report,
            Some(Address::repeat_byte(1)),
            &RoleCounters::default(),
        );
        assert_eq!(stats.total_products, 3);
        assert_eq!(stats.readable_products, 2);
        assert_eq!(stats.unreadable_products, 1);
        assert_eq!(stats.owned_by_caller, 2);
    }

    #[test]
    fn test_counters_default_to_zero_on_failure() {
        let counters = RoleCounters {
            producers: Some(2),
            quality_inspectors: None,
            distributors: Some(1),
            retailers: Some(4),
        };
        assert_eq!(counters.registered_participants(), 7);
        assert_eq!(counters.unavailable(), vec![RegistryRole::QualityInspector]);
    }

    #[test]
    fn test_transfer_policy() {
        let report = ScanReport::from_items(3, vec![]);
        let counters = RoleCounters::default();

        let stats = AggregationEngine::default().compute(&report, None, &counters);
        assert_eq!(stats.transfers, TransferFigure::Unavailable);

        let legacy = AggregationEngine::new(TransferPolicy::LegacyEstimate);
        assert_eq!(
            legacy.compute(&report, None, &counters).transfers,
            TransferFigure::Estimated(6)
        );
        let empty = ScanReport::from_items(0, vec![]);
        assert_eq!(
            legacy.compute(&empty, None, &counters).transfers,
            TransferFigure::Estimated(0)
        );
    }

    #[tokio::test]
    async fn test_refresh_publishes_snapshot() {
        let ledger = InMemoryLedger::new();
        let producer = Address::repeat_byte(9);
        ledger.seed_registration(RegistryRole::Producer, producer, "Farm");
        ledger.seed_registration(RegistryRole::Retailer, Address::repeat_byte(8), "Shop");
        ledger.seed_product(producer, "a", true);
        ledger.seed_product(producer, "b", false);
        ledger.seed_product(Address::repeat_byte(7), "c", true);
        ledger.revert_entry(2);
        ledger.fail_total(RegistryRole::Retailer);

        let gateway = ContractGateway::new(Arc::new(ledger));
        let dashboard = Dashboard::new(AggregationEngine::default(), 1);
        let snapshot = dashboard
            .refresh(&gateway, Some(producer), &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(snapshot.stats.total_products, 3);
        assert_eq!(snapshot.stats.approved_products, 2);
        assert_eq!(snapshot.stats.owned_by_caller, 1);
        assert_eq!(snapshot.stats.registered_participants, 1);
        assert_eq!(snapshot.stats.unavailable_counters, vec![RegistryRole::Retailer]);
        assert_eq!(snapshot.products.len(), 2);
        assert!(dashboard.latest().is_some());
    }

    #[tokio::test]
    async fn test_cancelled_refresh_keeps_previous_snapshot() {
        let ledger = InMemoryLedger::new();
        ledger.seed_product(Address::repeat_byte(1), "a", true);
        let gateway = ContractGateway::new(Arc::new(ledger));
        let dashboard = Dashboard::new(AggregationEngine::default(), 1);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = dashboard.refresh(&gateway, None, &cancel).await.unwrap();
        assert!(result.is_none());
        assert!(dashboard.latest().is_none());
    }
}
