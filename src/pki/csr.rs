use pem::{EncodeConfig, LineEnding, Pem};
use x509_parser::prelude::{FromDer, X509CertificationRequest};

use crate::errors::{Error, Result};

const CSR_LABELS: [&str; 2] = ["CERTIFICATE REQUEST", "NEW CERTIFICATE REQUEST"];

/// A PKCS#10 certificate signing request that has been decoded and had its
/// self-signature checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Csr {
    pem: String,
    der: Vec<u8>,
    subject: String,
}

fn invalid(reason: impl std::fmt::Display) -> Error {
    Error::parse(format!("certificate signing request: {}", reason))
}

impl Csr {
    /// Accept a CSR as PEM or raw DER.
    ///
    /// DER input is re-encoded as a `CERTIFICATE REQUEST` PEM block, which
    /// is the form Vault expects.
    pub fn parse(input: &[u8]) -> Result<Self> {
        let der = if input.windows(11).any(|w| w == b"-----BEGIN ") {
            let block = pem::parse(input).map_err(invalid)?;
            if !CSR_LABELS.iter().any(|label| *label == block.tag()) {
                return Err(invalid(format!("unexpected PEM block \"{}\"", block.tag())));
            }
            block.into_contents()
        } else {
            input.to_vec()
        };

        if der.is_empty() {
            return Err(invalid("input is empty"));
        }

        let (rest, request) = X509CertificationRequest::from_der(&der).map_err(invalid)?;
        if !rest.is_empty() {
            return Err(invalid("trailing data after request"));
        }
        request.verify_signature().map_err(|e| invalid(format!("bad signature: {}", e)))?;

        let subject = request.certification_request_info.subject.to_string();
        let pem = pem::encode_config(
            &Pem::new("CERTIFICATE REQUEST", der.clone()),
            EncodeConfig::new().set_line_ending(LineEnding::LF),
        );

        Ok(Self { pem, der, subject })
    }

    pub fn pem(&self) -> &str {
        &self.pem
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Subject distinguished name, for logging.
    pub fn subject(&self) -> &str {
        &self.subject
    }
}
