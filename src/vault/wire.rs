//! Request and response bodies of the Vault HTTP API calls this crate makes.

use serde::{Deserialize, Deserializer, Serialize};

use super::secret::SecretString;

/// Body of `POST <pki_mount>/root/sign-intermediate`.
#[derive(Debug, Serialize)]
pub(crate) struct SignIntermediateRequest<'a> {
    pub csr: &'a str,
    pub common_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
}

/// Body of `POST auth/<approle_mount>/login`.
#[derive(Serialize)]
pub(crate) struct AppRoleLoginRequest<'a> {
    pub role_id: &'a str,
    pub secret_id: &'a str,
}

/// Body of `POST auth/<cert_mount>/login`.
#[derive(Debug, Default, Serialize)]
pub(crate) struct CertLoginRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
}

/// Envelope around every Vault secrets response.
#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: Option<T>,
}

/// Certificate material returned by a sign call, exactly as sent on the wire.
///
/// Nothing here has been validated; see [`crate::pki::assemble`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SignResponse {
    /// Signed certificate (PEM)
    #[serde(default, deserialize_with = "null_as_default")]
    pub certificate: String,

    /// Certificate of the CA that signed it (PEM)
    #[serde(default, deserialize_with = "null_as_default")]
    pub issuing_ca: String,

    /// Chain above the issuing CA; each entry may hold several PEM blocks
    #[serde(default, deserialize_with = "null_as_default")]
    pub ca_chain: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub serial_number: String,
}

// Vault sends `null` for absent fields.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Envelope of a login response.
#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub auth: Option<AuthInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub client_token: SecretString,
    #[serde(default)]
    pub lease_duration: u64,
    #[serde(default)]
    pub renewable: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub policies: Vec<String>,
}
