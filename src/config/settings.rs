use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;
use url::Url;

use super::ttl::parse_ttl;
use crate::errors::{Error, Result};
use crate::vault::{AuthMethod, AuthStrategy, SecretString};

/// Common name requested for the signed intermediate unless configured.
pub const DEFAULT_COMMON_NAME: &str = "spire-server";

/// Environment lookup used to fill fields the configuration leaves empty.
pub type EnvLookup = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Raw plugin configuration as decoded from the TOML blob.
///
/// Nothing here is validated yet; [`PluginConfig::into_params`] turns it
/// into [`ClientParameters`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PluginConfig {
    /// Vault server URL (e.g., "https://vault.example.com:8200/")
    pub vault_addr: String,

    /// One of "token", "cert" or "approle"
    pub auth_method: String,

    /// Mount point of the auth method (`auth/<mount>/login`)
    #[serde(alias = "tls_auth_mount_point")]
    pub auth_mount_point: String,

    /// Mount point of the PKI secrets engine (`<mount>/root/sign-intermediate`)
    pub pki_mount_point: String,

    /// PEM or DER file holding the CA that issued Vault's server certificate
    pub ca_cert_path: String,

    /// Requested TTL of the signed intermediate (e.g., "1h")
    pub ttl: String,

    /// Accept any server certificate. Test environments only.
    pub tls_skip_verify: bool,

    /// Vault Enterprise namespace
    pub namespace: String,

    /// Common name requested for the signed intermediate
    pub common_name: String,

    pub token_auth_config: TokenAuthConfig,
    pub cert_auth_config: CertAuthConfig,
    pub approle_auth_config: AppRoleAuthConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TokenAuthConfig {
    /// Token sent as `X-Vault-Token`
    pub token: SecretString,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CertAuthConfig {
    /// PEM or DER client certificate
    pub client_cert_path: String,
    /// PEM or DER client private key
    pub client_key_path: String,
    /// Optional certificate role name to authenticate against
    pub cert_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppRoleAuthConfig {
    pub role_id: String,
    pub secret_id: SecretString,
}

/// Validated parameters for building an authenticated signing client.
#[derive(Debug, Clone)]
pub struct ClientParameters {
    pub vault_addr: Url,
    pub ca_cert_path: PathBuf,
    pub auth_method: AuthMethod,
    pub token: SecretString,
    pub client_cert_path: Option<PathBuf>,
    pub client_key_path: Option<PathBuf>,
    pub cert_name: Option<String>,
    pub role_id: String,
    pub secret_id: SecretString,
    pub auth_mount_point: String,
    pub pki_mount_point: String,
    pub ttl: Option<Duration>,
    pub tls_skip_verify: bool,
    pub namespace: Option<String>,
    pub common_name: String,
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn fill_from_env(field: &mut String, lookup: &EnvLookup, key: &str) {
    if field.trim().is_empty() {
        if let Some(value) = lookup(key).and_then(|v| non_empty(&v)) {
            *field = value;
        }
    }
}

impl PluginConfig {
    /// Decode a TOML configuration blob.
    pub fn decode(raw: &str) -> Result<Self> {
        toml::from_str(raw)
            .map_err(|e| Error::config(format!("failed to decode configuration: {}", e.message())))
    }

    /// Fill empty fields from `VAULT_*` environment variables.
    ///
    /// Explicit configuration always wins. Credentials are only taken from
    /// the environment for the auth method that is selected, and
    /// `tls_skip_verify` is never read from the environment.
    pub fn with_env(mut self, lookup: &EnvLookup) -> Self {
        fill_from_env(&mut self.vault_addr, lookup, "VAULT_ADDR");
        fill_from_env(&mut self.ca_cert_path, lookup, "VAULT_CACERT");
        fill_from_env(&mut self.namespace, lookup, "VAULT_NAMESPACE");

        match self.auth_method.trim().parse::<AuthMethod>() {
            Ok(AuthMethod::Token) if self.token_auth_config.token.is_empty() => {
                if let Some(token) = lookup("VAULT_TOKEN").and_then(|v| non_empty(&v)) {
                    self.token_auth_config.token = SecretString::new(token);
                }
            }
            Ok(AuthMethod::Cert) => {
                fill_from_env(&mut self.cert_auth_config.client_cert_path, lookup, "VAULT_CLIENT_CERT");
                fill_from_env(&mut self.cert_auth_config.client_key_path, lookup, "VAULT_CLIENT_KEY");
            }
            _ => {}
        }

        self
    }

    /// Validate the configuration and produce [`ClientParameters`].
    ///
    /// Performs no I/O. The TTL is checked first so its error text stays
    /// stable regardless of other problems.
    pub fn into_params(self) -> Result<ClientParameters> {
        let ttl = match non_empty(&self.ttl) {
            Some(ttl) => Some(
                parse_ttl(&ttl)
                    .map_err(|e| Error::config(format!("failed to parse TTL value: {}", e)))?,
            ),
            None => None,
        };

        let mut problems = Vec::new();

        let vault_addr = match non_empty(&self.vault_addr) {
            None => {
                problems.push("vault_addr is required".to_string());
                None
            }
            Some(addr) => match Url::parse(&addr) {
                Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Some(url),
                Ok(url) => {
                    problems.push(format!("vault_addr has unsupported scheme \"{}\"", url.scheme()));
                    None
                }
                Err(e) => {
                    problems.push(format!("vault_addr is not a valid URL: {}", e));
                    None
                }
            },
        };

        let ca_cert_path = non_empty(&self.ca_cert_path);
        if ca_cert_path.is_none() {
            problems.push("ca_cert_path is required".to_string());
        }

        let pki_mount_point = non_empty(&self.pki_mount_point).map(|m| m.trim_matches('/').to_string());
        if pki_mount_point.as_deref().map_or(true, str::is_empty) {
            problems.push("pki_mount_point is required".to_string());
        }

        let auth_method = match non_empty(&self.auth_method) {
            None => {
                problems.push("auth_method is required".to_string());
                None
            }
            Some(method) => match method.parse::<AuthMethod>() {
                Ok(method) => Some(method),
                Err(e) => {
                    problems.push(e.to_string());
                    None
                }
            },
        };

        let (Some(vault_addr), Some(ca_cert_path), Some(pki_mount_point), Some(auth_method)) =
            (vault_addr, ca_cert_path, pki_mount_point, auth_method)
        else {
            return Err(Error::config(format!("invalid configuration: {}", problems.join("; "))));
        };

        let auth_mount_point = non_empty(&self.auth_mount_point)
            .map(|m| m.trim_matches('/').to_string())
            .unwrap_or_else(|| auth_method.default_mount_point().to_string());

        warn_unused_credentials(&self, auth_method);

        let params = ClientParameters {
            vault_addr,
            ca_cert_path: PathBuf::from(ca_cert_path),
            auth_method,
            token: self.token_auth_config.token,
            client_cert_path: non_empty(&self.cert_auth_config.client_cert_path).map(PathBuf::from),
            client_key_path: non_empty(&self.cert_auth_config.client_key_path).map(PathBuf::from),
            cert_name: non_empty(&self.cert_auth_config.cert_name),
            role_id: self.approle_auth_config.role_id.trim().to_string(),
            secret_id: self.approle_auth_config.secret_id,
            auth_mount_point,
            pki_mount_point,
            ttl,
            tls_skip_verify: self.tls_skip_verify,
            namespace: non_empty(&self.namespace),
            common_name: non_empty(&self.common_name)
                .unwrap_or_else(|| DEFAULT_COMMON_NAME.to_string()),
        };

        // Strategy-specific fields are checked by the strategy itself.
        AuthStrategy::select(&params)?;

        Ok(params)
    }
}

fn warn_unused_credentials(config: &PluginConfig, method: AuthMethod) {
    let token_set = !config.token_auth_config.token.is_empty();
    let cert_set = !config.cert_auth_config.client_cert_path.trim().is_empty()
        || !config.cert_auth_config.client_key_path.trim().is_empty();
    let approle_set = !config.approle_auth_config.role_id.trim().is_empty()
        || !config.approle_auth_config.secret_id.is_empty();

    let ignored: Vec<&str> = [
        (token_set && method != AuthMethod::Token, "token_auth_config"),
        (cert_set && method != AuthMethod::Cert, "cert_auth_config"),
        (approle_set && method != AuthMethod::AppRole, "approle_auth_config"),
    ]
    .into_iter()
    .filter_map(|(set, name)| set.then_some(name))
    .collect();

    if !ignored.is_empty() {
        warn!(
            auth_method = %method,
            ignored = ?ignored,
            "Ignoring credentials configured for a different auth method"
        );
    }
}
