//! HashiCorp Vault client for the PKI secrets engine.
//!
//! - [`AuthStrategy`] selects and performs the login handshake
//! - [`transport::build`] turns validated parameters into a [`SigningClient`]
//! - [`SigningClient::sign_intermediate`] submits a CSR and returns the raw
//!   certificate material

pub mod auth;
pub mod client;
pub mod credentials;
pub mod secret;
pub mod transport;
pub mod wire;

pub use auth::{AuthMethod, AuthStrategy};
pub use client::{SignRequest, SigningClient};
pub use secret::SecretString;
pub use transport::{build, Transport};
pub use wire::SignResponse;
