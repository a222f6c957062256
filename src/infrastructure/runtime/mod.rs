//! Runtime infrastructure - connection lifecycle

mod connection;

pub use connection::ConnectionManager;
