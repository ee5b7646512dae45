//! Trust bundle assembly from a Vault sign response.
//!
//! The bundle is the CA chain in the order Vault returned it followed by
//! the issuing CA. Verifiers walk it in that order, so the issuing CA is
//! appended last by construction and nothing is ever sorted. Every PEM
//! block has to decode as X.509 or the whole response is rejected.

use crate::errors::{Error, Result};
use crate::vault::SignResponse;

/// Ordered DER-encoded certificates handed to the caller as upstream roots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustBundle {
    certificates: Vec<Vec<u8>>,
}

impl TrustBundle {
    pub fn certificates(&self) -> &[Vec<u8>] {
        &self.certificates
    }

    pub fn into_certificates(self) -> Vec<Vec<u8>> {
        self.certificates
    }

    /// All certificates concatenated into one DER byte string.
    pub fn concatenated(&self) -> Vec<u8> {
        self.certificates.concat()
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }
}

/// Signed leaf certificate plus the bundle that verifies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedCertificate {
    /// DER encoding of the signed certificate
    pub leaf: Vec<u8>,
    pub bundle: TrustBundle,
}

/// Decode every PEM block in `text`, requiring each to be an X.509 certificate.
fn decode_certificates(text: &str, what: &str) -> Result<Vec<Vec<u8>>> {
    let blocks = pem::parse_many(text).map_err(|e| Error::parse(format!("{}: {}", what, e)))?;
    if blocks.is_empty() {
        return Err(Error::parse(format!("{}: no PEM certificate found", what)));
    }

    blocks
        .into_iter()
        .map(|block| {
            if block.tag() != "CERTIFICATE" {
                return Err(Error::parse(format!(
                    "{}: unexpected PEM block \"{}\"",
                    what,
                    block.tag()
                )));
            }
            match x509_parser::parse_x509_certificate(block.contents()) {
                Ok((rest, _)) if rest.is_empty() => Ok(block.into_contents()),
                Ok(_) => Err(Error::parse(format!("{}: trailing data after certificate", what))),
                Err(e) => Err(Error::parse(format!("{}: {}", what, e))),
            }
        })
        .collect()
}

fn decode_single(text: &str, what: &str) -> Result<Vec<u8>> {
    let mut certificates = decode_certificates(text, what)?;
    if certificates.len() != 1 {
        return Err(Error::parse(format!(
            "{}: expected exactly one certificate, found {}",
            what,
            certificates.len()
        )));
    }
    Ok(certificates.remove(0))
}

/// Turn raw sign output into a DER leaf and an ordered [`TrustBundle`].
///
/// The bundle is `[ca_chain entries in order…, issuing_ca]`. A chain entry
/// holding several concatenated certificates contributes all of them in
/// the order they appear.
pub fn assemble(response: &SignResponse) -> Result<SignedCertificate> {
    let leaf = decode_single(&response.certificate, "leaf certificate")?;

    let mut certificates = Vec::new();
    for (index, entry) in response.ca_chain.iter().enumerate() {
        let what = format!("CA chain entry {}", index + 1);
        certificates.extend(decode_certificates(entry, &what)?);
    }

    certificates.push(decode_single(&response.issuing_ca, "CA certificate")?);

    Ok(SignedCertificate { leaf, bundle: TrustBundle { certificates } })
}
