use std::sync::Arc;
use std::time::Duration;

use fle_vault::{AadTokenProvider, CertificateCredential};
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::RsaPrivateKey;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_credential() -> CertificateCredential {
    let mut rng = rand::thread_rng();
    let key = RsaPrivateKey::new(&mut rng, 2048).expect("generate test RSA key");
    let pem = key.to_pkcs1_pem(rsa::pkcs1::LineEnding::LF).expect("encode pkcs1 pem");
    CertificateCredential::new("test-client-id", pem.as_bytes().to_vec(), b"test-certificate-der".to_vec())
}

#[tokio::test]
async fn acquires_and_caches_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "fake-access-token",
            "expires_in": 3600,
            "token_type": "Bearer",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let authority = format!("{}/oauth2/v2.0/token", server.uri());
    let provider = AadTokenProvider::new(
        authority,
        "https://vault.azure.net",
        Arc::new(test_credential()),
        Duration::from_millis(10),
        3,
        reqwest::Client::new(),
    );

    let cancel = CancellationToken::new();
    let token1 = provider.get_access_token(&cancel).await.unwrap();
    assert_eq!(token1, "fake-access-token");

    // Second call within the token lifetime must not hit the authority again;
    // wiremock's `expect(1)` on the mock above would fail teardown otherwise.
    let token2 = provider.get_access_token(&cancel).await.unwrap();
    assert_eq!(token2, "fake-access-token");
}

#[tokio::test]
async fn rejects_when_cancelled() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "unused",
            "expires_in": 3600,
        })))
        .expect(0)
        .mount(&server)
        .await;

    let authority = format!("{}/oauth2/v2.0/token", server.uri());
    let provider = AadTokenProvider::new(
        authority,
        "https://vault.azure.net",
        Arc::new(test_credential()),
        Duration::from_millis(10),
        3,
        reqwest::Client::new(),
    );

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = provider.get_access_token(&cancel).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn does_not_retry_on_client_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
        .expect(1)
        .mount(&server)
        .await;

    let authority = format!("{}/oauth2/v2.0/token", server.uri());
    let provider = AadTokenProvider::new(
        authority,
        "https://vault.azure.net",
        Arc::new(test_credential()),
        Duration::from_millis(5),
        3,
        reqwest::Client::new(),
    );

    let cancel = CancellationToken::new();
    let result = provider.get_access_token(&cancel).await;
    assert!(result.is_err());
}
