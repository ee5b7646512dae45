//! HTTPS stand-in for Vault's login endpoint, served over rustls.
//!
//! Answers `POST .../login` with [`CLIENT_TOKEN`] and everything else with
//! a 404. Optionally requires a client certificate issued by the test CA.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Context;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::RootCertStore;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_rustls::server::TlsStream;
use tokio_rustls::TlsAcceptor;

use super::support::{TestPki, CLIENT_TOKEN, LOGIN_PATH};

pub struct TlsVault {
    addr: SocketAddr,
    logins: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl TlsVault {
    /// Serve on an ephemeral localhost port with the CA-issued server certificate.
    pub async fn start(pki: &TestPki, require_client_cert: bool) -> anyhow::Result<Self> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder = rustls::ServerConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .context("select TLS versions")?;

        let builder = if require_client_cert {
            let mut roots = RootCertStore::empty();
            roots
                .add(CertificateDer::from(pki.ca_der.clone()))
                .context("add client CA")?;
            let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider)
                .build()
                .context("build client verifier")?;
            builder.with_client_cert_verifier(verifier)
        } else {
            builder.with_no_client_auth()
        };

        let server_config = builder
            .with_single_cert(
                vec![CertificateDer::from(pki.server_cert_der.clone())],
                PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(pki.server_key_der.clone())),
            )
            .context("load server certificate")?;

        let acceptor = TlsAcceptor::from(Arc::new(server_config));
        let listener = TcpListener::bind("127.0.0.1:0").await.context("bind listener")?;
        let addr = listener.local_addr().context("local addr")?;
        let logins = Arc::new(AtomicUsize::new(0));

        let counter = logins.clone();
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let acceptor = acceptor.clone();
                let counter = counter.clone();
                tokio::spawn(async move {
                    // Handshake failures are what the untrusted-peer tests expect.
                    if let Ok(tls) = acceptor.accept(stream).await {
                        let _ = respond(tls, &counter).await;
                    }
                });
            }
        });

        Ok(Self { addr, logins, task })
    }

    pub fn uri(&self) -> String {
        format!("https://{}", self.addr)
    }

    /// Login requests that completed the TLS handshake.
    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }
}

impl Drop for TlsVault {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|pos| pos + 4)
}

async fn respond(mut stream: TlsStream<TcpStream>, logins: &AtomicUsize) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_len = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = header_end(&buf) {
            break end;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_len]).into_owned();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_len + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let request_line = head.lines().next().unwrap_or_default();
    let (status, body) = if request_line == format!("POST {LOGIN_PATH} HTTP/1.1") {
        logins.fetch_add(1, Ordering::SeqCst);
        ("200 OK", json!({ "auth": { "client_token": CLIENT_TOKEN, "lease_duration": 60 } }))
    } else {
        ("404 Not Found", json!({ "errors": [] }))
    };

    let body = body.to_string();
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}
