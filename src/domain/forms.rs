//! Input forms backing the mutating operations.
//!
//! A form is cleared only after its submission is confirmed on the ledger.

use alloy::primitives::Address;

use super::{Operation, ProductDraft, RegistryRole, ValidationError};

pub trait SubmissionForm {
    fn to_operation(&self) -> Operation;
    fn clear(&mut self);
}

/// Role registration form (address + details)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationForm {
    pub role: RegistryRole,
    pub account: String,
    pub details: String,
}

impl RegistrationForm {
    pub fn new(role: RegistryRole) -> Self {
        Self {
            role,
            account: String::new(),
            details: String::new(),
        }
    }

    /// "Use my address": fill the account field with the connected account
    pub fn fill_account(&mut self, connected: Option<Address>) -> Result<(), ValidationError> {
        let account = connected.ok_or(ValidationError::NotConnected)?;
        self.account = account.to_checksum(None);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.account.is_empty() && self.details.is_empty()
    }
}

impl SubmissionForm for RegistrationForm {
    fn to_operation(&self) -> Operation {
        Operation::Register {
            role: self.role,
            account: self.account.clone(),
            details: self.details.clone(),
        }
    }

    fn clear(&mut self) {
        self.account.clear();
        self.details.clear();
    }
}

/// Product creation form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductForm {
    pub draft: ProductDraft,
}

impl SubmissionForm for ProductForm {
    fn to_operation(&self) -> Operation {
        Operation::CreateProduct(self.draft.clone())
    }

    fn clear(&mut self) {
        self.draft = ProductDraft::default();
    }
}
