//! Signing client for the Vault PKI `root/sign-intermediate` endpoint.

use std::time::Duration;

use tracing::{debug, error, info};
use url::Url;

use super::auth::AuthMethod;
use super::secret::SecretString;
use super::transport::Transport;
use super::wire::{DataEnvelope, SignIntermediateRequest, SignResponse};
use crate::config::ttl::format_ttl;
use crate::errors::{Error, Result};
use crate::pki::Csr;

const TOKEN_HEADER: &str = "X-Vault-Token";

/// A validated request to sign an intermediate CA certificate.
#[derive(Debug, Clone)]
pub struct SignRequest {
    pub common_name: String,
    pub csr: Csr,
    pub ttl: Option<Duration>,
}

impl SignRequest {
    /// Build a request, rejecting anything that is not a PKCS#10 CSR.
    pub fn new(common_name: impl Into<String>, csr: &[u8], ttl: Option<Duration>) -> Result<Self> {
        Ok(Self { common_name: common_name.into(), csr: Csr::parse(csr)?, ttl })
    }
}

/// Authenticated client for one Vault PKI mount.
///
/// Built once per successful configuration by [`super::transport::build`]
/// and never mutated afterwards; reconfiguration replaces it wholesale.
#[derive(Debug, Clone)]
pub struct SigningClient {
    transport: Transport,
    token: SecretString,
    auth_method: AuthMethod,
    pki_mount: String,
    ttl: Option<Duration>,
    common_name: String,
}

impl SigningClient {
    pub fn new(
        transport: Transport,
        token: SecretString,
        auth_method: AuthMethod,
        pki_mount: String,
        ttl: Option<Duration>,
        common_name: String,
    ) -> Self {
        Self { transport, token, auth_method, pki_mount, ttl, common_name }
    }

    pub fn vault_addr(&self) -> &Url {
        self.transport.base_url()
    }

    pub fn pki_mount(&self) -> &str {
        &self.pki_mount
    }

    pub fn auth_method(&self) -> AuthMethod {
        self.auth_method
    }

    /// TTL requested when the caller does not supply one.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub fn common_name(&self) -> &str {
        &self.common_name
    }

    /// Submit the CSR to `<pki_mount>/root/sign-intermediate`.
    ///
    /// A non-2xx status yields [`Error::Sign`] carrying the response body
    /// verbatim. The call is made exactly once.
    pub async fn sign_intermediate(&self, request: &SignRequest) -> Result<SignResponse> {
        let url = self.transport.endpoint(&format!("{}/root/sign-intermediate", self.pki_mount))?;
        let ttl = request.ttl.map(format_ttl);

        debug!(
            url = %url,
            common_name = %request.common_name,
            csr_subject = %request.csr.subject(),
            ttl = ?ttl,
            "Submitting CSR to Vault PKI"
        );

        let body = SignIntermediateRequest {
            csr: request.csr.pem(),
            common_name: &request.common_name,
            ttl,
        };

        let response = self
            .transport
            .post(url.clone())
            .header(TOKEN_HEADER, self.token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::sign(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::sign(format!("failed to read response from {}: {}", url, e)))?;

        if !status.is_success() {
            error!(url = %url, status = %status, "Vault PKI rejected sign-intermediate request");
            return Err(Error::sign(format!("{} returned status {}: {}", url, status, text)));
        }

        if text.trim().is_empty() {
            return Err(Error::sign(format!("empty response from {}", url)));
        }

        let envelope: DataEnvelope<SignResponse> = serde_json::from_str(&text)
            .map_err(|e| Error::sign(format!("malformed response from {}: {}", url, e)))?;

        let signed = envelope
            .data
            .filter(|data| !data.certificate.trim().is_empty())
            .ok_or_else(|| Error::sign(format!("empty response from {}", url)))?;

        info!(
            pki_mount = %self.pki_mount,
            serial_number = %signed.serial_number,
            chain_entries = signed.ca_chain.len(),
            "Vault PKI signed intermediate certificate"
        );

        Ok(signed)
    }
}
