use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use vault_upstream::{Error, MintX509CaRequest, MintX509CaResponse, ResultSink, SinkError};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use x509_parser::prelude::{FromDer, X509Certificate};

use super::support::*;

fn request(pki: &TestPki, preferred_ttl: i32) -> MintX509CaRequest {
    MintX509CaRequest { csr: pki.csr_pem.clone().into_bytes(), preferred_ttl }
}

async fn mint(
    plugin: &vault_upstream::VaultPlugin,
    request: MintX509CaRequest,
) -> Result<Vec<MintX509CaResponse>, Error> {
    let mut sink: Vec<MintX509CaResponse> = Vec::new();
    plugin.mint_x509_ca(request, &mut sink, &CancellationToken::new()).await?;
    Ok(sink)
}

#[tokio::test]
async fn mint_returns_leaf_and_ordered_roots() {
    let server = MockServer::start().await;
    let pki = TestPki::generate().unwrap();
    mount_login(&server, json!({ "role_id": ROLE_ID, "secret_id": SECRET_ID })).await;
    mount_sign(&server, &pki, CLIENT_TOKEN, 1).await;

    let plugin = plugin();
    plugin.configure(&pki.config(&server, "approle")).await.unwrap();

    let responses = mint(&plugin, request(&pki, 0)).await.unwrap();
    assert_eq!(responses.len(), 1);

    let response = &responses[0];
    assert_eq!(response.x509_ca_chain, vec![pki.leaf_der.clone()]);
    assert_eq!(
        response.upstream_x509_roots,
        vec![pki.chain_der[0].clone(), pki.chain_der[1].clone(), pki.ca_der.clone()]
    );

    let (_, leaf) = X509Certificate::from_der(&response.x509_ca_chain[0]).unwrap();
    assert_eq!(leaf.public_key().raw, pki.csr_public_key.as_slice());
}

#[tokio::test]
async fn mint_with_cert_auth_uses_login_token() {
    let server = MockServer::start().await;
    let pki = TestPki::generate().unwrap();
    mount_login(&server, json!({})).await;
    mount_sign(&server, &pki, CLIENT_TOKEN, 1).await;

    let plugin = plugin();
    plugin.configure(&pki.config(&server, "cert")).await.unwrap();

    let responses = mint(&plugin, request(&pki, 0)).await.unwrap();
    assert_eq!(responses[0].upstream_x509_roots.len(), 3);
}

#[tokio::test]
async fn mint_sends_csr_common_name_and_preferred_ttl() {
    let server = MockServer::start().await;
    let pki = TestPki::generate().unwrap();
    Mock::given(method("POST"))
        .and(path(SIGN_PATH))
        .and(body_partial_json(json!({
            "common_name": "spire-server",
            "ttl": "7200s",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(pki.sign_response()))
        .expect(1)
        .mount(&server)
        .await;

    let plugin = token_plugin(&server, &pki).await;
    mint(&plugin, request(&pki, 7200)).await.unwrap();
}

#[tokio::test]
async fn mint_falls_back_to_configured_ttl() {
    let server = MockServer::start().await;
    let pki = TestPki::generate().unwrap();
    Mock::given(method("POST"))
        .and(path(SIGN_PATH))
        .and(body_partial_json(json!({ "common_name": "upstream-ca", "ttl": "5400s" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(pki.sign_response()))
        .expect(1)
        .mount(&server)
        .await;

    let plugin = plugin();
    let config =
        pki.config_with(&server, "token", "ttl = \"1h30m\"\ncommon_name = \"upstream-ca\"");
    plugin.configure(&config).await.unwrap();

    mint(&plugin, request(&pki, -1)).await.unwrap();
}

#[tokio::test]
async fn mint_accepts_der_csr() {
    let server = MockServer::start().await;
    let pki = TestPki::generate().unwrap();
    mount_sign(&server, &pki, STATIC_TOKEN, 1).await;

    let plugin = token_plugin(&server, &pki).await;
    let request = MintX509CaRequest { csr: pki.csr_der.clone(), preferred_ttl: 0 };

    assert_eq!(mint(&plugin, request).await.unwrap().len(), 1);
}

#[tokio::test]
async fn backend_error_is_sign_error_with_body() {
    let server = MockServer::start().await;
    let pki = TestPki::generate().unwrap();
    Mock::given(method("POST"))
        .and(path(SIGN_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("fake error"))
        .expect(1)
        .mount(&server)
        .await;

    let plugin = token_plugin(&server, &pki).await;
    let err = mint(&plugin, request(&pki, 0)).await.unwrap_err();

    assert!(matches!(err, Error::Sign(_)), "unexpected error: {err:?}");
    assert!(err.to_string().contains("fake error"));
}

#[tokio::test]
async fn empty_backend_response_is_sign_error() {
    let server = MockServer::start().await;
    let pki = TestPki::generate().unwrap();
    Mock::given(method("POST"))
        .and(path(SIGN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": null })))
        .expect(1)
        .mount(&server)
        .await;

    let plugin = token_plugin(&server, &pki).await;
    let err = mint(&plugin, request(&pki, 0)).await.unwrap_err();

    assert!(matches!(err, Error::Sign(_)));
    assert!(err.to_string().contains("empty response"));
}

#[tokio::test]
async fn malformed_certificate_in_response_is_parse_error() {
    let server = MockServer::start().await;
    let pki = TestPki::generate().unwrap();
    let mut body = pki.sign_response();
    body["data"]["issuing_ca"] =
        json!("-----BEGIN CERTIFICATE-----\nbm90IGEgY2VydA==\n-----END CERTIFICATE-----\n");
    Mock::given(method("POST"))
        .and(path(SIGN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let plugin = token_plugin(&server, &pki).await;
    let err = mint(&plugin, request(&pki, 0)).await.unwrap_err();

    assert!(matches!(err, Error::Parse(_)), "unexpected error: {err:?}");
}

#[tokio::test]
async fn malformed_csr_is_rejected_before_backend_call() {
    let server = MockServer::start().await;
    let pki = TestPki::generate().unwrap();
    mount_sign(&server, &pki, STATIC_TOKEN, 0).await;

    let plugin = token_plugin(&server, &pki).await;
    let request = MintX509CaRequest { csr: b"not a csr".to_vec(), preferred_ttl: 0 };
    let err = mint(&plugin, request).await.unwrap_err();

    assert!(matches!(err, Error::Parse(_)), "unexpected error: {err:?}");
}

#[tokio::test]
async fn mint_before_configure_is_not_configured() {
    let pki = TestPki::generate().unwrap();
    let err = mint(&plugin(), request(&pki, 0)).await.unwrap_err();
    assert!(matches!(err, Error::NotConfigured));
}

#[tokio::test]
async fn cancellation_wins_over_slow_backend() {
    let server = MockServer::start().await;
    let pki = TestPki::generate().unwrap();
    Mock::given(method("POST"))
        .and(path(SIGN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(pki.sign_response())
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let plugin = token_plugin(&server, &pki).await;
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let mut sink: Vec<MintX509CaResponse> = Vec::new();
    let err = plugin.mint_x509_ca(request(&pki, 0), &mut sink, &cancel).await.unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert!(sink.is_empty());
}

#[tokio::test]
async fn closed_stream_is_delivery_error() {
    let server = MockServer::start().await;
    let pki = TestPki::generate().unwrap();
    mount_sign(&server, &pki, STATIC_TOKEN, 1).await;

    let plugin = token_plugin(&server, &pki).await;
    let (mut tx, rx) = mpsc::channel::<MintX509CaResponse>(1);
    drop(rx);

    let err = plugin
        .mint_x509_ca(request(&pki, 0), &mut tx, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Delivery(_)));
    assert_eq!(err.to_string(), "failed to deliver result: response stream closed by caller");
}

struct RefusingSink;

#[async_trait]
impl ResultSink for RefusingSink {
    async fn send(&mut self, _response: MintX509CaResponse) -> Result<(), SinkError> {
        Err(SinkError::new("sink full"))
    }
}

#[tokio::test]
async fn failing_sink_is_delivery_error() {
    let server = MockServer::start().await;
    let pki = TestPki::generate().unwrap();
    mount_sign(&server, &pki, STATIC_TOKEN, 1).await;

    let plugin = token_plugin(&server, &pki).await;
    let err = plugin
        .mint_x509_ca(request(&pki, 0), &mut RefusingSink, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Delivery(_)));
}

#[tokio::test]
async fn streamed_result_reaches_receiver() {
    let server = MockServer::start().await;
    let pki = TestPki::generate().unwrap();
    mount_sign(&server, &pki, STATIC_TOKEN, 1).await;

    let plugin = token_plugin(&server, &pki).await;
    let (mut tx, mut rx) = mpsc::channel(1);
    plugin
        .mint_x509_ca(request(&pki, 0), &mut tx, &CancellationToken::new())
        .await
        .unwrap();

    let response = rx.recv().await.unwrap();
    assert_eq!(response.x509_ca_chain, vec![pki.leaf_der.clone()]);
}
