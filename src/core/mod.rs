pub mod status;

pub use status::{Severity, StatusBanner, StatusMessage, TxStatus, DEFAULT_STATUS_TIMEOUT};
