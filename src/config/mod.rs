//! # Configuration
//!
//! Decoding and validation of the plugin configuration blob.
//!
//! The blob is TOML. Fields left empty are filled from the usual `VAULT_*`
//! environment variables, then everything is validated into
//! [`ClientParameters`] before any network call is made.

pub mod settings;
pub mod ttl;

pub use settings::{
    AppRoleAuthConfig, CertAuthConfig, ClientParameters, EnvLookup, PluginConfig, TokenAuthConfig,
    DEFAULT_COMMON_NAME,
};
pub use ttl::{parse_ttl, TtlError};
