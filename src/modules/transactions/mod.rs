//! Transaction orchestration
//!
//! Drives a single user operation through validate, submit and confirm,
//! reporting each step on the status banner:
//!
//! ```text
//! Idle -> Pending -> Success | Failure -> (timeout) Idle
//! ```
//!
//! Validation failures never reach the network. A confirmed transaction
//! triggers a dashboard refresh.

use std::sync::Arc;

use alloy::primitives::B256;
use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::core::{StatusBanner, TxStatus};
use crate::domain::{Operation, SubmissionForm, ValidationError};
use crate::infrastructure::ethereum::TxReceipt;
use crate::infrastructure::ConnectionManager;
use crate::modules::dashboard::Dashboard;

/// Terminal outcome of one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Confirmed {
        tx_hash: B256,
        block_number: Option<u64>,
    },
    /// Rejected locally, nothing was sent
    Rejected(ValidationError),
    /// Submission or confirmation failed
    Failed(String),
    /// Cancelled before completion; no further status writes were made
    Cancelled,
}

impl SubmitOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, SubmitOutcome::Confirmed { .. })
    }
}

pub struct TransactionOrchestrator {
    connection: Arc<ConnectionManager>,
    dashboard: Arc<Dashboard>,
    banner: StatusBanner,
}

impl TransactionOrchestrator {
    pub fn new(
        connection: Arc<ConnectionManager>,
        dashboard: Arc<Dashboard>,
        banner: StatusBanner,
    ) -> Self {
        Self {
            connection,
            dashboard,
            banner,
        }
    }

    pub fn banner(&self) -> &StatusBanner {
        &self.banner
    }

    /// Run `operation` to completion.
    ///
    /// Status transitions are published on the banner; the returned outcome
    /// mirrors the final one.
    pub async fn submit(&self, operation: Operation, cancel: &CancellationToken) -> SubmitOutcome {
        let call = match operation.validate() {
            Ok(call) => call,
            Err(err) => {
                tracing::debug!(error = %err, "operation rejected");
                self.banner.set(TxStatus::Failure(err.to_string()));
                return SubmitOutcome::Rejected(err);
            }
        };

        let gateway = self.connection.gateway().await;
        if !gateway.is_signed() {
            let err = ValidationError::NotConnected;
            self.banner.set(TxStatus::Failure(err.to_string()));
            return SubmitOutcome::Rejected(err);
        }

        let function = call.function_name();
        self.banner.set(TxStatus::Pending(operation.pending_message()));

        let result: Option<Result<TxReceipt>> = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = async {
                let pending = gateway.submit(call).await?;
                tracing::info!(function, tx_hash = %pending.tx_hash(), "transaction submitted");
                pending.confirm().await
            } => Some(result),
        };

        let outcome = match result {
            None => {
                tracing::info!(function, "transaction cancelled");
                return SubmitOutcome::Cancelled;
            }
            Some(Ok(receipt)) => {
                tracing::info!(
                    function,
                    tx_hash = %receipt.tx_hash,
                    block = ?receipt.block_number,
                    "transaction confirmed"
                );
                self.banner.set(TxStatus::Success(operation.success_message()));
                SubmitOutcome::Confirmed {
                    tx_hash: receipt.tx_hash,
                    block_number: receipt.block_number,
                }
            }
            Some(Err(err)) => {
                let message = format!("{err:#}");
                tracing::warn!(function, error = %message, "transaction failed");
                self.banner.set(TxStatus::Failure(message.clone()));
                return SubmitOutcome::Failed(message);
            }
        };

        let caller = self.connection.account().await;
        if let Err(err) = self.dashboard.refresh(&gateway, caller, cancel).await {
            tracing::warn!(error = %format!("{err:#}"), "dashboard refresh after confirmation failed");
        }
        outcome
    }

    /// Submit the form's operation; the form is cleared only on confirmation
    pub async fn submit_form<F: SubmissionForm>(
        &self,
        form: &mut F,
        cancel: &CancellationToken,
    ) -> SubmitOutcome {
        let outcome = self.submit(form.to_operation(), cancel).await;
        if outcome.is_confirmed() {
            form.clear();
        }
        outcome
    }
}
