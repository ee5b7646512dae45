//! Request and response envelopes of the upstream CA protocol.
//!
//! Only the fields this bridge reads or writes are modelled.

use serde::{Deserialize, Serialize};

/// Unary submit call: sign a CSR with the configured TTL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitCsrRequest {
    /// PKCS#10 request, PEM or DER
    pub csr: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitCsrResponse {
    /// DER encoding of the signed certificate
    pub cert: Vec<u8>,
    /// Concatenated DER of the chain certificates followed by the issuing CA
    pub upstream_trust_bundle: Vec<u8>,
}

/// Streaming mint call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintX509CaRequest {
    /// PKCS#10 request, PEM or DER
    pub csr: Vec<u8>,
    /// Requested TTL in seconds; zero or negative means the configured TTL
    pub preferred_ttl: i32,
}

/// The single message sent back on a mint stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintX509CaResponse {
    /// `[signed certificate]`, each entry DER
    pub x509_ca_chain: Vec<Vec<u8>>,
    /// Chain certificates followed by the issuing CA, each entry DER
    pub upstream_x509_roots: Vec<Vec<u8>>,
}

/// Static description of the plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub configured: bool,
}
