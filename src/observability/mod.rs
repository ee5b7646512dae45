//! # Observability
//!
//! Structured logging for the Vault upstream bridge.

pub mod logging;

pub use logging::{init_logging, log_client_parameters};
