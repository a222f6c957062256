//! Domain models for the supply-chain ledger
//!
//! Pure types and validation, independent of the ledger transport.

pub mod account;
mod error;
pub mod forms;
mod operation;
mod product;
mod role;

pub use account::{is_valid_account, parse_account, short_account};
pub use error::ValidationError;
pub use forms::{ProductForm, RegistrationForm, SubmissionForm};
pub use operation::{parse_epoch_seconds, parse_product_id, LedgerCall, Operation, ProductDraft};
pub use product::{ProductDetails, ProductRecord};
pub use role::{ParticipantRole, RegistryRole};
