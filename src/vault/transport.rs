//! Authenticated transport construction.
//!
//! [`build`] runs the whole configure-time pipeline: load the trust root,
//! load the client identity when the certificate strategy needs one, build
//! the HTTP client, log in, and bind the session token into a
//! [`SigningClient`]. Nothing is returned unless every step succeeded.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use tracing::{info, warn};
use url::Url;

use super::auth::AuthStrategy;
use super::client::SigningClient;
use super::credentials::{load_client_identity, load_trust_root};
use crate::config::ClientParameters;
use crate::errors::{CredentialError, Error, Result};

/// Timeout applied to every request sent to Vault.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const NAMESPACE_HEADER: &str = "X-Vault-Namespace";

/// HTTP client bound to one Vault server.
///
/// Cloning is cheap and shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct Transport {
    http: Client,
    base: Url,
    namespace: Option<String>,
}

impl Transport {
    pub fn new(http: Client, vault_addr: &Url, namespace: Option<String>) -> Self {
        let mut base = vault_addr.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.set_query(None);
        base.set_fragment(None);
        Self { http, base, namespace }
    }

    /// Vault server address with a trailing slash.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve an API path such as `pki/root/sign-intermediate` under `/v1/`.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let relative = format!("v1/{}", path.trim_start_matches('/'));
        self.base
            .join(&relative)
            .map_err(|e| Error::config(format!("invalid Vault API path \"{}\": {}", relative, e)))
    }

    /// Start a POST request carrying the namespace header when configured.
    pub fn post(&self, url: Url) -> RequestBuilder {
        let request = self.http.post(url);
        match &self.namespace {
            Some(namespace) => request.header(NAMESPACE_HEADER, namespace),
            None => request,
        }
    }
}

fn build_http_client(
    params: &ClientParameters,
    strategy: &AuthStrategy,
) -> std::result::Result<Client, CredentialError> {
    let roots = load_trust_root(&params.ca_cert_path)?;

    let mut builder = Client::builder()
        .use_rustls_tls()
        .tls_built_in_root_certs(false)
        .timeout(REQUEST_TIMEOUT);

    for root in roots {
        builder = builder.add_root_certificate(root);
    }

    if let Some((cert_path, key_path)) = strategy.client_identity() {
        builder = builder.identity(load_client_identity(cert_path, key_path)?);
    }

    if params.tls_skip_verify {
        warn!(
            vault_addr = %params.vault_addr,
            "Vault server certificate verification is disabled (tls_skip_verify); never use this outside tests"
        );
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder.build().map_err(|e| CredentialError::Transport { source: e.into() })
}

/// Build an authenticated [`SigningClient`] from validated parameters.
///
/// Credential and trust-root problems are [`Error::Config`]; a failed login
/// is [`Error::Auth`].
pub async fn build(params: &ClientParameters) -> Result<SigningClient> {
    let strategy = AuthStrategy::select(params)?;
    let http = build_http_client(params, &strategy)?;
    let transport = Transport::new(http, &params.vault_addr, params.namespace.clone());

    let token = strategy.login(&transport).await?;

    info!(
        vault_addr = %transport.base_url(),
        auth_method = %strategy.method(),
        pki_mount = %params.pki_mount_point,
        "Vault signing client ready"
    );

    Ok(SigningClient::new(
        transport,
        token,
        strategy.method(),
        params.pki_mount_point.clone(),
        params.ttl,
        params.common_name.clone(),
    ))
}
