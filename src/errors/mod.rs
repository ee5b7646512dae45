//! # Error Handling
//!
//! Error taxonomy for the Vault upstream bridge. Every failure surfaced by
//! the crate maps onto exactly one [`Error`] variant so callers can tell a
//! bad configuration apart from a backend rejection or a delivery failure.

pub mod credentials;

pub use credentials::CredentialError;

/// Custom result type for Vault upstream operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the Vault upstream bridge
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Malformed or incomplete configuration, detected before any I/O
    #[error("{0}")]
    Config(String),

    /// Login handshake with the Vault auth backend failed
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The PKI backend rejected or failed the signing call
    #[error("sign request failed: {0}")]
    Sign(String),

    /// Malformed CSR or malformed certificate material
    #[error("failed to parse {0}")]
    Parse(String),

    /// A sign operation was attempted before a successful configuration
    #[error("plugin not configured")]
    NotConfigured,

    /// The result could not be handed to the caller
    #[error("failed to deliver result: {0}")]
    Delivery(String),

    /// The caller cancelled the operation while it was in flight
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new authentication error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        Self::Auth(message.into())
    }

    /// Create a new signing error
    pub fn sign<S: Into<String>>(message: S) -> Self {
        Self::Sign(message.into())
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new delivery error
    pub fn delivery<S: Into<String>>(message: S) -> Self {
        Self::Delivery(message.into())
    }

    /// Short, stable name of the error kind for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Auth(_) => "auth",
            Self::Sign(_) => "sign",
            Self::Parse(_) => "parse",
            Self::NotConfigured => "not_configured",
            Self::Delivery(_) => "delivery",
            Self::Cancelled => "cancelled",
        }
    }
}

impl From<CredentialError> for Error {
    fn from(err: CredentialError) -> Self {
        Self::Config(err.to_string())
    }
}
