//! # Vault Upstream
//!
//! Upstream certificate authority bridge that has intermediate CA
//! certificates signed by the HashiCorp Vault PKI secrets engine.
//!
//! ## Architecture
//!
//! ```text
//! host handler → VaultPlugin → SigningClient → Vault (auth/<mount>/login,
//!                    ↓              ↓                  <pki>/root/sign-intermediate)
//!              PluginConfig    TrustBundle
//! ```
//!
//! ## Core Components
//!
//! - **Configuration**: TOML blob with `VAULT_*` environment fallbacks
//! - **Vault client**: reqwest over rustls, token / cert / AppRole login
//! - **PKI**: CSR validation and trust bundle assembly
//! - **Plugin**: atomically swappable client, unary and streaming sign calls
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use tokio_util::sync::CancellationToken;
//! use vault_upstream::{MintX509CaRequest, MintX509CaResponse, Result, VaultPlugin};
//!
//! async fn mint(csr: Vec<u8>) -> Result<Vec<MintX509CaResponse>> {
//!     let plugin = VaultPlugin::new();
//!     plugin
//!         .configure(
//!             r#"
//!             vault_addr = "https://vault.example.com:8200/"
//!             ca_cert_path = "/etc/vault/ca.pem"
//!             pki_mount_point = "pki"
//!             auth_method = "token"
//!             "#,
//!         )
//!         .await?;
//!
//!     let mut results = Vec::new();
//!     plugin
//!         .mint_x509_ca(
//!             MintX509CaRequest { csr, preferred_ttl: 3600 },
//!             &mut results,
//!             &CancellationToken::new(),
//!         )
//!         .await?;
//!     Ok(results)
//! }
//! ```

pub mod config;
pub mod errors;
pub mod observability;
pub mod pki;
pub mod plugin;
pub mod vault;

// Re-export commonly used types and traits
pub use config::{ClientParameters, PluginConfig};
pub use errors::{Error, Result};
pub use observability::init_logging;
pub use plugin::{
    MintX509CaRequest, MintX509CaResponse, PluginInfo, ResultSink, SinkError, SubmitCsrRequest,
    SubmitCsrResponse, VaultPlugin, PLUGIN_NAME,
};
pub use vault::{AuthMethod, SigningClient};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
