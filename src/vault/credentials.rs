//! Loading of the Vault trust root and the mutual-TLS client identity.
//!
//! Both PEM and DER files are accepted. Every certificate is decoded as
//! X.509 before it is handed to the HTTP client so a broken file is a
//! configuration error rather than a TLS handshake failure later on.

use std::fs;
use std::path::Path;

use anyhow::anyhow;
use rustls::pki_types::{pem::PemObject, CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use x509_parser::prelude::{FromDer, X509Certificate};
use zeroize::Zeroizing;

use crate::errors::CredentialError;

fn looks_like_pem(bytes: &[u8]) -> bool {
    bytes.windows(11).any(|window| window == b"-----BEGIN ")
}

/// Read every certificate in a PEM bundle, or the single certificate of a DER file.
pub fn read_certificates(path: &Path) -> Result<Vec<CertificateDer<'static>>, CredentialError> {
    let bytes = fs::read(path)
        .map_err(|e| CredentialError::CertificateReadError { path: path.to_path_buf(), source: e })?;

    let certificates: Vec<CertificateDer<'static>> = if looks_like_pem(&bytes) {
        CertificateDer::pem_slice_iter(&bytes)
            .map(|result| {
                result.map_err(|err| CredentialError::InvalidCertificatePem {
                    path: path.to_path_buf(),
                    source: anyhow!(err),
                })
            })
            .collect::<Result<_, _>>()?
    } else if bytes.is_empty() {
        Vec::new()
    } else {
        vec![CertificateDer::from(bytes)]
    };

    if certificates.is_empty() {
        return Err(CredentialError::EmptyCertificateChain { path: path.to_path_buf() });
    }

    for certificate in &certificates {
        match X509Certificate::from_der(certificate.as_ref()) {
            Ok((rest, _)) if rest.is_empty() => {}
            Ok(_) => {
                return Err(CredentialError::InvalidCertificate {
                    path: path.to_path_buf(),
                    source: anyhow!("trailing data after certificate"),
                })
            }
            Err(err) => {
                return Err(CredentialError::InvalidCertificate {
                    path: path.to_path_buf(),
                    source: anyhow!("{err}"),
                })
            }
        }
    }

    Ok(certificates)
}

/// Load the CA certificates used to verify Vault's server certificate.
pub fn load_trust_root(path: &Path) -> Result<Vec<reqwest::Certificate>, CredentialError> {
    read_certificates(path)?
        .iter()
        .map(|der| {
            reqwest::Certificate::from_der(der.as_ref())
                .map_err(|err| CredentialError::Transport { source: anyhow!(err) })
        })
        .collect()
}

fn read_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, CredentialError> {
    let bytes = Zeroizing::new(
        fs::read(path)
            .map_err(|e| CredentialError::PrivateKeyReadError { path: path.to_path_buf(), source: e })?,
    );

    if looks_like_pem(&bytes) {
        return PrivateKeyDer::from_pem_slice(&bytes).map_err(|err| {
            CredentialError::InvalidPrivateKey { path: path.to_path_buf(), source: Some(anyhow!(err)) }
        });
    }

    if bytes.is_empty() {
        return Err(CredentialError::InvalidPrivateKey { path: path.to_path_buf(), source: None });
    }

    // Raw DER keys are taken to be PKCS#8.
    Ok(PrivateKeyDer::from(PrivatePkcs8KeyDer::from(bytes.to_vec())))
}

/// Load the client certificate and key presented during mutual TLS.
pub fn load_client_identity(
    cert_path: &Path,
    key_path: &Path,
) -> Result<reqwest::Identity, CredentialError> {
    let certificates = read_certificates(cert_path)?;
    let key = read_private_key(key_path)?;

    let label = match &key {
        PrivateKeyDer::Pkcs1(_) => "RSA PRIVATE KEY",
        PrivateKeyDer::Sec1(_) => "EC PRIVATE KEY",
        PrivateKeyDer::Pkcs8(_) => "PRIVATE KEY",
        _ => {
            return Err(CredentialError::InvalidPrivateKey {
                path: key_path.to_path_buf(),
                source: None,
            })
        }
    };

    let mut blocks: Vec<pem::Pem> = certificates
        .iter()
        .map(|der| pem::Pem::new("CERTIFICATE", der.as_ref().to_vec()))
        .collect();
    blocks.push(pem::Pem::new(label, key.secret_der().to_vec()));

    let bundle = Zeroizing::new(pem::encode_many(&blocks));
    reqwest::Identity::from_pem(bundle.as_bytes())
        .map_err(|err| CredentialError::Transport { source: anyhow!(err) })
}
