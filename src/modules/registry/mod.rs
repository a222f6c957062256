//! Registry scanning
//!
//! Enumerates numbered product entries one read per id. A failed or vacant
//! entry becomes a typed skip and the scan moves on; nothing is cached
//! between scans.

use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::domain::ProductRecord;
use crate::infrastructure::ethereum::ContractGateway;

/// Why an id produced no record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// Read succeeded but the entry was never written
    Missing,
    /// Read reverted or the provider failed
    CallFailed(String),
}

/// Per-id scan outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ScanItem {
    Read(ProductRecord),
    Skipped { id: u64, reason: SkipReason },
}

impl ScanItem {
    pub fn id(&self) -> u64 {
        match self {
            ScanItem::Read(record) => record.id,
            ScanItem::Skipped { id, .. } => *id,
        }
    }

    pub fn record(&self) -> Option<&ProductRecord> {
        match self {
            ScanItem::Read(record) => Some(record),
            ScanItem::Skipped { .. } => None,
        }
    }
}

/// Result of scanning the whole registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Number of ids the registry has assigned (`nextProductId - 1`)
    pub requested: u64,
    pub items: Vec<ScanItem>,
    /// Scan stopped early on cancellation
    pub cancelled: bool,
}

impl ScanReport {
    pub fn from_items(requested: u64, items: Vec<ScanItem>) -> Self {
        Self {
            requested,
            items,
            cancelled: false,
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &ProductRecord> {
        self.items.iter().filter_map(ScanItem::record)
    }

    pub fn skipped(&self) -> impl Iterator<Item = (u64, &SkipReason)> {
        self.items.iter().filter_map(|item| match item {
            ScanItem::Skipped { id, reason } => Some((*id, reason)),
            ScanItem::Read(_) => None,
        })
    }

    pub fn readable_count(&self) -> u64 {
        self.records().count() as u64
    }

    pub fn unreadable_count(&self) -> u64 {
        self.skipped().count() as u64
    }

    /// e.g. `Loaded 2 of 3 products (1 unreadable)`
    pub fn summary(&self) -> String {
        let mut text = format!(
            "Loaded {} of {} products",
            self.readable_count(),
            self.requested
        );
        let unreadable = self.unreadable_count();
        if unreadable > 0 {
            text.push_str(&format!(" ({unreadable} unreadable)"));
        }
        if self.cancelled {
            text.push_str(" [cancelled]");
        }
        text
    }
}

#[derive(Debug, Clone)]
pub struct RegistryScanner {
    gateway: ContractGateway,
    concurrency: usize,
}

impl RegistryScanner {
    /// Strictly sequential scanner
    pub fn new(gateway: ContractGateway) -> Self {
        Self {
            gateway,
            concurrency: 1,
        }
    }

    /// Allow up to `n` reads in flight. Output order and per-item fault
    /// isolation are unchanged.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// Lazy ordered stream of outcomes for ids `start..=end`.
    ///
    /// Every call starts a fresh scan. The stream ends early once `cancel`
    /// fires; no new id is scheduled after that. Reads already in flight
    /// (up to the concurrency limit) still complete and are yielded.
    pub fn scan_range(
        &self,
        start: u64,
        end: u64,
        cancel: CancellationToken,
    ) -> impl Stream<Item = ScanItem> + Send + 'static {
        let gateway = self.gateway.clone();
        let start = start.max(1);

        stream::iter(start..=end)
            .take_while(move |_| futures::future::ready(!cancel.is_cancelled()))
            .map(move |id| {
                let gateway = gateway.clone();
                async move { read_entry(&gateway, id).await }
            })
            .buffered(self.concurrency)
    }

    /// Scan every assigned id (`1..nextProductId`)
    pub async fn scan_all(&self, cancel: &CancellationToken) -> anyhow::Result<ScanReport> {
        let next = self.gateway.next_product_id().await?;
        let requested = next.saturating_sub(1);

        let items: Vec<ScanItem> = self
            .scan_range(1, requested, cancel.clone())
            .collect()
            .await;
        let cancelled = cancel.is_cancelled() && (items.len() as u64) < requested;

        tracing::debug!(requested, read = items.len(), cancelled, "registry scan finished");
        Ok(ScanReport {
            requested,
            items,
            cancelled,
        })
    }
}

async fn read_entry(gateway: &ContractGateway, id: u64) -> ScanItem {
    match gateway.get_basic_info(id).await {
        Ok(record) if record.is_vacant() => {
            tracing::debug!(id, "skipping vacant entry");
            ScanItem::Skipped {
                id,
                reason: SkipReason::Missing,
            }
        }
        Ok(record) => ScanItem::Read(ProductRecord { id, ..record }),
        Err(err) => {
            let message = format!("{err:#}");
            tracing::debug!(id, error = %message, "skipping unreadable entry");
            ScanItem::Skipped {
                id,
                reason: SkipReason::CallFailed(message),
            }
        }
    }
}
