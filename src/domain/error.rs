use thiserror::Error;

/// Input rejected before any network call is made
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid {field} address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("Invalid {field} address checksum: {value}")]
    BadChecksum { field: &'static str, value: String },

    #[error("Missing {0}")]
    EmptyField(&'static str),

    #[error("Invalid product id: {0}")]
    InvalidProductId(String),

    #[error("Cannot parse {field} date: {value}")]
    InvalidDate { field: &'static str, value: String },

    #[error("Connect wallet first")]
    NotConnected,
}
