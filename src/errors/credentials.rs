use std::path::PathBuf;

use thiserror::Error;

/// Failures while loading the trust root or the client certificate/key pair.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The certificate file could not be read.
    #[error("failed to read certificate at {path}: {source}")]
    CertificateReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The private key file could not be read.
    #[error("failed to read private key at {path}: {source}")]
    PrivateKeyReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No certificates were found in the supplied file.
    #[error("certificate file {path} does not contain any certificates")]
    EmptyCertificateChain { path: PathBuf },

    /// The PEM contents were invalid or unreadable.
    #[error("certificate file {path} is not a valid PEM: {source}")]
    InvalidCertificatePem {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// A certificate block did not decode as X.509.
    #[error("certificate file {path} contains a malformed X.509 certificate: {source}")]
    InvalidCertificate {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// The private key contents were invalid or unsupported.
    #[error("private key file {path} does not contain a supported private key")]
    InvalidPrivateKey {
        path: PathBuf,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The HTTP client rejected the loaded material.
    #[error("failed to configure TLS for the Vault transport: {source}")]
    Transport {
        #[source]
        source: anyhow::Error,
    },
}
