//! # Structured Logging
//!
//! Subscriber setup and span helpers built on the tracing ecosystem.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::ClientParameters;

/// Create a tracing span for a plugin operation.
///
/// ```rust,ignore
/// let span = vault_span!("configure");
/// let span = vault_span!("mint_x509_ca", preferred_ttl = 3600);
/// ```
#[macro_export]
macro_rules! vault_span {
    ($operation:expr) => {
        tracing::info_span!(
            "vault_operation",
            operation = %$operation,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($operation:expr, $($field:tt)*) => {
        tracing::info_span!(
            "vault_operation",
            operation = %$operation,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Install a global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `default_level`. Calling this when a
/// subscriber is already installed (e.g. by the host or a test harness) is
/// not an error.
pub fn init_logging(default_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let result = if json {
        tracing::subscriber::set_global_default(
            fmt::Subscriber::builder().with_env_filter(filter).json().finish(),
        )
    } else {
        tracing::subscriber::set_global_default(
            fmt::Subscriber::builder().with_env_filter(filter).finish(),
        )
    };

    if result.is_err() {
        tracing::debug!("Global tracing subscriber already installed; keeping it");
    }
}

/// Log the effective client parameters. Credentials are never included.
pub fn log_client_parameters(params: &ClientParameters) {
    tracing::info!(
        vault_addr = %params.vault_addr,
        auth_method = %params.auth_method,
        auth_mount = %params.auth_mount_point,
        pki_mount = %params.pki_mount_point,
        ttl_secs = ?params.ttl.map(|ttl| ttl.as_secs()),
        namespace = ?params.namespace,
        tls_skip_verify = params.tls_skip_verify,
        "Vault upstream configuration"
    );
}
