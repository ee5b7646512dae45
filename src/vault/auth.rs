//! Authentication strategies for logging in to Vault.
//!
//! The strategy is a closed enum: each variant owns only the credentials
//! its own login call needs, and [`AuthStrategy::login`] matches on it
//! exhaustively.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, info};

use super::secret::SecretString;
use super::transport::Transport;
use super::wire::{AppRoleLoginRequest, CertLoginRequest, LoginResponse};
use crate::config::ClientParameters;
use crate::errors::{Error, Result};

/// Configuration tag selecting an [`AuthStrategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMethod {
    /// Static token sent as `X-Vault-Token`
    Token,
    /// TLS certificate auth method
    Cert,
    /// AppRole auth method
    AppRole,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::Cert => "cert",
            Self::AppRole => "approle",
        }
    }

    /// Mount point used when the configuration does not name one.
    pub fn default_mount_point(&self) -> &'static str {
        match self {
            Self::Token => "",
            Self::Cert => "cert",
            Self::AppRole => "approle",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "token" => Ok(Self::Token),
            "cert" => Ok(Self::Cert),
            "approle" => Ok(Self::AppRole),
            other => Err(Error::config(format!(
                "unknown auth_method \"{}\" (expected one of: token, cert, approle)",
                other
            ))),
        }
    }
}

/// A login strategy together with the credentials it needs.
#[derive(Debug, Clone)]
pub enum AuthStrategy {
    Token {
        token: SecretString,
    },
    Certificate {
        mount_point: String,
        cert_name: Option<String>,
        client_cert_path: PathBuf,
        client_key_path: PathBuf,
    },
    AppRole {
        mount_point: String,
        role_id: String,
        secret_id: SecretString,
    },
}

fn missing(field: &str, method: AuthMethod) -> Error {
    Error::config(format!(
        "invalid configuration: {} is required for auth_method \"{}\"",
        field, method
    ))
}

impl AuthStrategy {
    /// Pick the strategy named by `params.auth_method` and check its fields.
    pub fn select(params: &ClientParameters) -> Result<Self> {
        let method = params.auth_method;
        match method {
            AuthMethod::Token => {
                if params.token.is_empty() {
                    return Err(missing("token_auth_config.token", method));
                }
                Ok(Self::Token { token: params.token.clone() })
            }
            AuthMethod::Cert => {
                let client_cert_path = params
                    .client_cert_path
                    .clone()
                    .ok_or_else(|| missing("cert_auth_config.client_cert_path", method))?;
                let client_key_path = params
                    .client_key_path
                    .clone()
                    .ok_or_else(|| missing("cert_auth_config.client_key_path", method))?;
                if params.auth_mount_point.is_empty() {
                    return Err(missing("auth_mount_point", method));
                }
                Ok(Self::Certificate {
                    mount_point: params.auth_mount_point.clone(),
                    cert_name: params.cert_name.clone(),
                    client_cert_path,
                    client_key_path,
                })
            }
            AuthMethod::AppRole => {
                if params.role_id.is_empty() {
                    return Err(missing("approle_auth_config.role_id", method));
                }
                if params.secret_id.is_empty() {
                    return Err(missing("approle_auth_config.secret_id", method));
                }
                if params.auth_mount_point.is_empty() {
                    return Err(missing("auth_mount_point", method));
                }
                Ok(Self::AppRole {
                    mount_point: params.auth_mount_point.clone(),
                    role_id: params.role_id.clone(),
                    secret_id: params.secret_id.clone(),
                })
            }
        }
    }

    pub fn method(&self) -> AuthMethod {
        match self {
            Self::Token { .. } => AuthMethod::Token,
            Self::Certificate { .. } => AuthMethod::Cert,
            Self::AppRole { .. } => AuthMethod::AppRole,
        }
    }

    /// Client certificate and key to present during mutual TLS, if any.
    pub fn client_identity(&self) -> Option<(&Path, &Path)> {
        match self {
            Self::Certificate { client_cert_path, client_key_path, .. } => {
                Some((client_cert_path.as_path(), client_key_path.as_path()))
            }
            Self::Token { .. } | Self::AppRole { .. } => None,
        }
    }

    /// Perform the login handshake and return the session token.
    ///
    /// Transport failures are reported as [`Error::Auth`] and never retried.
    pub async fn login(&self, transport: &Transport) -> Result<SecretString> {
        match self {
            Self::Token { token } => {
                debug!("Using configured Vault token as session credential");
                Ok(token.clone())
            }
            Self::Certificate { mount_point, cert_name, .. } => {
                let body = CertLoginRequest { name: cert_name.as_deref() };
                request_token(transport, mount_point, &body, AuthMethod::Cert).await
            }
            Self::AppRole { mount_point, role_id, secret_id } => {
                let body = AppRoleLoginRequest {
                    role_id: role_id.as_str(),
                    secret_id: secret_id.expose_secret(),
                };
                request_token(transport, mount_point, &body, AuthMethod::AppRole).await
            }
        }
    }
}

async fn request_token<B: serde::Serialize + ?Sized>(
    transport: &Transport,
    mount_point: &str,
    body: &B,
    method: AuthMethod,
) -> Result<SecretString> {
    let url = transport.endpoint(&format!("auth/{}/login", mount_point))?;

    let response = transport
        .post(url.clone())
        .json(body)
        .send()
        .await
        .map_err(|e| Error::auth(format!("login request to {} failed: {}", url, e)))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| Error::auth(format!("failed to read login response from {}: {}", url, e)))?;

    if !status.is_success() {
        return Err(Error::auth(format!("{} returned status {}: {}", url, status, text)));
    }

    let login: LoginResponse = serde_json::from_str(&text)
        .map_err(|e| Error::auth(format!("malformed login response from {}: {}", url, e)))?;

    let auth = login
        .auth
        .filter(|auth| !auth.client_token.is_empty())
        .ok_or_else(|| Error::auth(format!("login response from {} did not contain a client token", url)))?;

    info!(
        auth_method = %method,
        auth_mount = %mount_point,
        lease_duration = auth.lease_duration,
        renewable = auth.renewable,
        policies = ?auth.policies,
        "Authenticated to Vault"
    );

    Ok(auth.client_token)
}
