//! Mutating ledger operations: raw user input, validation, and the
//! validated call that is dispatched through the gateway.

use alloy::primitives::Address;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::account::parse_account;
use super::{RegistryRole, ValidationError};

/// A validated, ready-to-dispatch ledger call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    Register {
        role: RegistryRole,
        account: Address,
        details: String,
    },
    CreateProduct {
        name: String,
        batch_id: String,
        category: String,
        production_date: u64,
        metadata_uri: String,
    },
    AssignDistributor {
        product_id: u64,
        distributor: Address,
    },
    AssignRetailer {
        product_id: u64,
        retailer: Address,
    },
    AddCertification {
        product_id: u64,
        certification: String,
    },
    ApproveQuality {
        product_id: u64,
        expiry_date: u64,
    },
    SellToConsumer {
        product_id: u64,
        consumer: Address,
    },
}

impl LedgerCall {
    /// Contract function name, for logs
    pub fn function_name(&self) -> &'static str {
        match self {
            LedgerCall::Register { role, .. } => match role {
                RegistryRole::Producer => "registerProducer",
                RegistryRole::QualityInspector => "registerQualityInspector",
                RegistryRole::Distributor => "registerDistributor",
                RegistryRole::Retailer => "registerRetailer",
            },
            LedgerCall::CreateProduct { .. } => "createProduct",
            LedgerCall::AssignDistributor { .. } => "assignDistributor",
            LedgerCall::AssignRetailer { .. } => "assignRetailer",
            LedgerCall::AddCertification { .. } => "addCertification",
            LedgerCall::ApproveQuality { .. } => "approveQuality",
            LedgerCall::SellToConsumer { .. } => "sellToConsumer",
        }
    }
}

/// Product creation input as typed by the user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub batch_id: String,
    pub category: String,
    pub production_date: String,
    pub metadata_uri: String,
}

/// A mutating operation with unvalidated (string) arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Register {
        role: RegistryRole,
        account: String,
        details: String,
    },
    CreateProduct(ProductDraft),
    AssignDistributor {
        product_id: String,
        distributor: String,
    },
    AssignRetailer {
        product_id: String,
        retailer: String,
    },
    AddCertification {
        product_id: String,
        certification: String,
    },
    ApproveQuality {
        product_id: String,
        expiry_date: String,
    },
    SellToConsumer {
        product_id: String,
        consumer: String,
    },
}

impl Operation {
    /// Synchronous validation and coercion. Never touches the network.
    pub fn validate(&self) -> Result<LedgerCall, ValidationError> {
        match self {
            Operation::Register {
                role,
                account,
                details,
            } => Ok(LedgerCall::Register {
                role: *role,
                account: parse_account(role.noun(), account)?,
                details: required("details", details)?,
            }),
            Operation::CreateProduct(draft) => Ok(LedgerCall::CreateProduct {
                name: required("product name", &draft.name)?,
                batch_id: required("batch id", &draft.batch_id)?,
                category: required("category", &draft.category)?,
                production_date: parse_epoch_seconds("production", &draft.production_date)?,
                metadata_uri: draft.metadata_uri.trim().to_string(),
            }),
            Operation::AssignDistributor {
                product_id,
                distributor,
            } => Ok(LedgerCall::AssignDistributor {
                product_id: parse_product_id(product_id)?,
                distributor: parse_account("distributor", distributor)?,
            }),
            Operation::AssignRetailer {
                product_id,
                retailer,
            } => Ok(LedgerCall::AssignRetailer {
                product_id: parse_product_id(product_id)?,
                retailer: parse_account("retailer", retailer)?,
            }),
            Operation::AddCertification {
                product_id,
                certification,
            } => Ok(LedgerCall::AddCertification {
                product_id: parse_product_id(product_id)?,
                certification: required("certification", certification)?,
            }),
            Operation::ApproveQuality {
                product_id,
                expiry_date,
            } => Ok(LedgerCall::ApproveQuality {
                product_id: parse_product_id(product_id)?,
                expiry_date: parse_epoch_seconds("expiry", expiry_date)?,
            }),
            Operation::SellToConsumer {
                product_id,
                consumer,
            } => Ok(LedgerCall::SellToConsumer {
                product_id: parse_product_id(product_id)?,
                consumer: parse_account("consumer", consumer)?,
            }),
        }
    }

    /// Status text shown while the transaction is in flight
    pub fn pending_message(&self) -> String {
        match self {
            Operation::Register { role, .. } => format!("Registering {}...", role.noun()),
            Operation::CreateProduct(_) => "Creating product...".into(),
            Operation::AssignDistributor { .. } => "Assigning distributor...".into(),
            Operation::AssignRetailer { .. } => "Assigning retailer...".into(),
            Operation::AddCertification { .. } => "Adding certification...".into(),
            Operation::ApproveQuality { .. } => "Approving quality...".into(),
            Operation::SellToConsumer { .. } => "Selling to consumer...".into(),
        }
    }

    /// Status text shown once the transaction is confirmed
    pub fn success_message(&self) -> String {
        match self {
            Operation::Register { role, .. } => format!("{} registered ✓", role.label()),
            Operation::CreateProduct(_) => "Product created ✓".into(),
            Operation::AssignDistributor { .. } => "Distributor assigned ✓".into(),
            Operation::AssignRetailer { .. } => "Retailer assigned ✓".into(),
            Operation::AddCertification { .. } => "Certification added ✓".into(),
            Operation::ApproveQuality { .. } => "Quality approved ✓".into(),
            Operation::SellToConsumer { .. } => "Sold to consumer ✓".into(),
        }
    }
}

/// Positive integer product id
pub fn parse_product_id(input: &str) -> Result<u64, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("product id"));
    }
    match trimmed.parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ValidationError::InvalidProductId(trimmed.to_string())),
    }
}

/// Coerce a date input into unix seconds.
///
/// Accepts raw unix seconds, `YYYY-MM-DD` (midnight UTC),
/// `YYYY-MM-DDTHH:MM[:SS]` (UTC) and RFC 3339.
pub fn parse_epoch_seconds(field: &'static str, input: &str) -> Result<u64, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }

    let invalid = || ValidationError::InvalidDate {
        field,
        value: trimmed.to_string(),
    };

    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        return trimmed.parse::<u64>().map_err(|_| invalid());
    }

    let seconds = if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?.and_utc().timestamp()
    } else if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        dt.timestamp()
    } else if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        dt.and_utc().timestamp()
    } else if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M") {
        dt.and_utc().timestamp()
    } else {
        return Err(invalid());
    };

    u64::try_from(seconds).map_err(|_| invalid())
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::EmptyField(field))
    } else {
        Ok(trimmed.to_string())
    }
}
