//! Upstream CA plugin adapter.
//!
//! [`VaultPlugin`] is the single long-lived value the host's handler layer
//! holds. It starts unconfigured; each successful [`VaultPlugin::configure`]
//! builds a fresh [`SigningClient`] and swaps it in atomically. Sign calls
//! take a snapshot of the current client and keep using it until they
//! finish, so reconfiguration and in-flight signing never wait on each
//! other. Configure calls themselves are serialized and apply in the
//! order they started.

pub mod sink;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};

use crate::config::{EnvLookup, PluginConfig};
use crate::errors::{Error, Result};
use crate::observability::log_client_parameters;
use crate::pki::{assemble, SignedCertificate};
use crate::vault::{self, SignRequest, SigningClient};

pub use sink::{ResultSink, SinkError};
pub use types::{
    MintX509CaRequest, MintX509CaResponse, PluginInfo, SubmitCsrRequest, SubmitCsrResponse,
};

/// Name the plugin registers under.
pub const PLUGIN_NAME: &str = "vault";

/// Upstream CA backed by Vault's PKI secrets engine.
pub struct VaultPlugin {
    client: ArcSwapOption<SigningClient>,
    configure_lock: Mutex<()>,
    env: Arc<EnvLookup>,
}

impl std::fmt::Debug for VaultPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultPlugin").field("client", &self.client.load()).finish()
    }
}

impl Default for VaultPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl VaultPlugin {
    /// Unconfigured plugin reading `VAULT_*` overrides from the process environment.
    pub fn new() -> Self {
        Self::with_env_lookup(|key| std::env::var(key).ok())
    }

    /// Unconfigured plugin with a custom environment lookup.
    pub fn with_env_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            client: ArcSwapOption::empty(),
            configure_lock: Mutex::new(()),
            env: Arc::new(lookup),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client.load().is_some()
    }

    /// Snapshot of the installed client.
    pub fn current_client(&self) -> Result<Arc<SigningClient>> {
        self.client.load_full().ok_or(Error::NotConfigured)
    }

    pub fn plugin_info(&self) -> PluginInfo {
        PluginInfo {
            name: PLUGIN_NAME,
            version: crate::VERSION,
            configured: self.is_configured(),
        }
    }

    /// Decode, validate and authenticate, then install the new client.
    ///
    /// On any failure the previously installed client stays in place.
    pub async fn configure(&self, raw_configuration: &str) -> Result<()> {
        let span = crate::vault_span!("configure");
        async {
            let _exclusive = self.configure_lock.lock().await;

            let params = PluginConfig::decode(raw_configuration)?
                .with_env(self.env.as_ref())
                .into_params()?;
            log_client_parameters(&params);

            let client = vault::build(&params).await?;
            let replaced = self.client.swap(Some(Arc::new(client))).is_some();

            info!(reconfigured = replaced, "Vault upstream plugin configured");
            Ok(())
        }
        .instrument(span)
        .await
        .inspect_err(|e: &Error| warn!(error = %e, kind = e.kind(), "Configuration rejected"))
    }

    /// Unary submit: sign the CSR with the configured TTL.
    pub async fn submit_csr(
        &self,
        request: SubmitCsrRequest,
        cancel: &CancellationToken,
    ) -> Result<SubmitCsrResponse> {
        let span = crate::vault_span!("submit_csr");
        async {
            let client = self.current_client()?;
            let signed = sign(&client, &request.csr, None, cancel).await?;
            Ok(SubmitCsrResponse {
                upstream_trust_bundle: signed.bundle.concatenated(),
                cert: signed.leaf,
            })
        }
        .instrument(span)
        .await
        .inspect_err(|e: &Error| warn!(error = %e, kind = e.kind(), "SubmitCSR failed"))
    }

    /// Streaming mint: sign the CSR and deliver the result into `sink`.
    ///
    /// A sink failure is reported as [`Error::Delivery`] even though the
    /// certificate was signed.
    pub async fn mint_x509_ca(
        &self,
        request: MintX509CaRequest,
        sink: &mut dyn ResultSink,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let span = crate::vault_span!("mint_x509_ca", preferred_ttl = request.preferred_ttl);
        async {
            let client = self.current_client()?;
            let ttl = u64::try_from(request.preferred_ttl)
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs);

            let signed = sign(&client, &request.csr, ttl, cancel).await?;
            let response = MintX509CaResponse {
                x509_ca_chain: vec![signed.leaf],
                upstream_x509_roots: signed.bundle.into_certificates(),
            };

            sink.send(response).await.map_err(|e| Error::delivery(e.to_string()))
        }
        .instrument(span)
        .await
        .inspect_err(|e: &Error| warn!(error = %e, kind = e.kind(), "MintX509CA failed"))
    }
}

/// CSR in, signed leaf and trust bundle out.
///
/// Cancellation wins over a backend call that has not completed yet.
async fn sign(
    client: &SigningClient,
    csr: &[u8],
    ttl: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<SignedCertificate> {
    let request = SignRequest::new(client.common_name(), csr, ttl.or(client.ttl()))?;

    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(Error::Cancelled),
        response = client.sign_intermediate(&request) => response?,
    };

    assemble(&response)
}
