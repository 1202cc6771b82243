//! Key-vault access client: wrap/unwrap of raw key bytes against a remote
//! vault, with authority discovery and retry.

use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use moka::future::Cache;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::cert::CertificateCredential;
use crate::error::VaultError;
use crate::retry::RetryPolicy;
use crate::token::AadTokenProvider;

#[derive(Serialize)]
struct KeyOpRequest<'a> {
    alg: &'a str,
    value: String,
}

#[derive(Deserialize)]
struct KeyOpResponse {
    kid: String,
    value: String,
}

/// Authenticated HTTPS client performing wrap/unwrap against a remote
/// key vault, discovering authority/resource per key URI on first use.
pub struct KeyVaultAccessClient {
    credential: Arc<CertificateCredential>,
    http: reqwest::Client,
    retry: RetryPolicy,
    aad_retry_interval: Duration,
    aad_retry_count: u32,
    api_version: String,
    providers: Cache<String, Arc<AadTokenProvider>>,
}

impl KeyVaultAccessClient {
    pub fn new(
        credential: CertificateCredential,
        http: reqwest::Client,
        retry: RetryPolicy,
        aad_retry_interval: Duration,
        aad_retry_count: u32,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            credential: Arc::new(credential),
            http,
            retry,
            aad_retry_interval,
            aad_retry_count,
            api_version: api_version.into(),
            providers: Cache::new(10_000),
        }
    }

    /// Wrap raw key bytes (base64) under the key named by `key_uri`.
    pub async fn wrap(
        &self,
        key_uri: &str,
        bytes_base64: &str,
        cancel: &CancellationToken,
    ) -> Result<(String, String), VaultError> {
        self.key_op(key_uri, bytes_base64, "wrapkey", cancel).await
    }

    /// Unwrap ciphertext (base64) to the plaintext key bytes.
    pub async fn unwrap(
        &self,
        key_uri: &str,
        ciphertext_base64: &str,
        cancel: &CancellationToken,
    ) -> Result<(String, String), VaultError> {
        self.key_op(key_uri, ciphertext_base64, "unwrapkey", cancel).await
    }

    async fn key_op(
        &self,
        key_uri: &str,
        input_base64: &str,
        operation: &str,
        cancel: &CancellationToken,
    ) -> Result<(String, String), VaultError> {
        if cancel.is_cancelled() {
            return Err(VaultError::Cancelled);
        }
        validate_key_uri(key_uri)?;
        validate_base64(input_base64)?;

        let provider = self.provider_for(key_uri, cancel).await?;
        let value_b64url = to_base64url(input_base64)?;

        let result = self
            .retry
            .run(cancel, || async {
                self.try_key_op(key_uri, operation, &value_b64url, provider.as_ref(), cancel).await
            })
            .await?;

        Ok(result)
    }

    async fn try_key_op(
        &self,
        key_uri: &str,
        operation: &str,
        value_b64url: &str,
        provider: &AadTokenProvider,
        cancel: &CancellationToken,
    ) -> Result<(String, String), (bool, VaultError)> {
        let token = provider.get_access_token(cancel).await.map_err(|e| (false, e))?;

        let url = format!("{}/{}?api-version={}", key_uri.trim_end_matches('/'), operation, self.api_version);
        let body = KeyOpRequest { alg: "RSA-OAEP", value: value_b64url.to_string() };

        let resp = self
            .http
            .post(&url)
            .bearer_auth(token)
            .header("x-ms-client-request-id", Uuid::new_v4().to_string())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(key_uri, operation, error = %e, "key vault request failed to send");
                (true, VaultError::ServiceUnavailable(e.to_string()))
            })?;

        let status = resp.status();
        match status {
            StatusCode::OK => {
                let parsed: KeyOpResponse = resp
                    .json()
                    .await
                    .map_err(|e| (false, VaultError::WrapUnwrapFailure(e.to_string())))?;
                let value_std = from_base64url(&parsed.value).map_err(|e| (false, e))?;
                Ok((value_std, parsed.kid))
            }
            StatusCode::BAD_REQUEST => {
                let detail = resp.text().await.unwrap_or_default();
                tracing::error!(key_uri, operation, "key vault rejected request body");
                Err((false, VaultError::WrapUnwrapFailure(detail)))
            }
            StatusCode::FORBIDDEN => {
                tracing::warn!(key_uri, operation, "key vault returned forbidden, rewrap may be needed");
                Err((false, VaultError::AuthenticationFailure))
            }
            StatusCode::NOT_FOUND => {
                tracing::error!(key_uri, operation, "key vault has no such key");
                Err((false, VaultError::KeyNotFound))
            }
            other if other.is_server_error() => {
                tracing::warn!(key_uri, operation, status = other.as_u16(), "key vault returned a server error");
                Err((true, VaultError::InternalServerError(other.as_u16())))
            }
            other => {
                tracing::error!(key_uri, operation, status = other.as_u16(), "key vault returned an unexpected status");
                Err((false, VaultError::InternalServerError(other.as_u16())))
            }
        }
    }

    /// Get or single-flight-initialize the token provider for `key_uri`,
    /// discovering authority/resource via an unauthenticated probe.
    async fn provider_for(
        &self,
        key_uri: &str,
        cancel: &CancellationToken,
    ) -> Result<Arc<AadTokenProvider>, VaultError> {
        if cancel.is_cancelled() {
            return Err(VaultError::Cancelled);
        }

        let key = key_uri.to_string();
        self.providers
            .try_get_with(key, self.discover_provider(key_uri))
            .await
            .map_err(|e: Arc<VaultError>| clone_vault_error(&e))
    }

    async fn discover_provider(&self, key_uri: &str) -> Result<Arc<AadTokenProvider>, VaultError> {
        let probe_url = format!("{}?api-version={}", key_uri.trim_end_matches('/'), self.api_version);
        let resp = self.http.get(&probe_url).send().await.map_err(|e| {
            tracing::warn!(key_uri, error = %e, "authority discovery probe failed to send");
            VaultError::ServiceUnavailable(e.to_string())
        })?;

        if resp.status() != StatusCode::UNAUTHORIZED {
            tracing::error!(key_uri, status = %resp.status(), "authority discovery probe did not return 401");
            return Err(VaultError::AuthorityDiscoveryFailed(format!(
                "expected 401 from unauthenticated probe, got {}",
                resp.status()
            )));
        }

        let challenge = resp.headers().get("www-authenticate").and_then(|v| v.to_str().ok()).ok_or_else(|| {
            tracing::error!(key_uri, "authority discovery probe missing WWW-Authenticate header");
            VaultError::AuthorityDiscoveryFailed("missing WWW-Authenticate header".into())
        })?;

        let (authority, resource) = parse_bearer_challenge(challenge)?;

        Ok(Arc::new(AadTokenProvider::new(
            authority,
            resource,
            Arc::clone(&self.credential),
            self.aad_retry_interval,
            self.aad_retry_count,
            self.http.clone(),
        )))
    }
}

fn clone_vault_error(e: &VaultError) -> VaultError {
    match e {
        VaultError::InvalidKeyUri(s) => VaultError::InvalidKeyUri(s.clone()),
        VaultError::InvalidBase64 => VaultError::InvalidBase64,
        VaultError::AuthorityDiscoveryFailed(s) => VaultError::AuthorityDiscoveryFailed(s.clone()),
        VaultError::KeyNotFound => VaultError::KeyNotFound,
        VaultError::AuthenticationFailure => VaultError::AuthenticationFailure,
        VaultError::WrapUnwrapFailure(s) => VaultError::WrapUnwrapFailure(s.clone()),
        VaultError::InternalServerError(s) => VaultError::InternalServerError(*s),
        VaultError::ServiceUnavailable(s) => VaultError::ServiceUnavailable(s.clone()),
        VaultError::AadUnavailable(s) => VaultError::AadUnavailable(s.clone()),
        VaultError::Cancelled => VaultError::Cancelled,
    }
}

/// Parse `Bearer authorization="...", resource="..."` into (authority, resource).
fn parse_bearer_challenge(header: &str) -> Result<(String, String), VaultError> {
    let authorization = extract_quoted(header, "authorization")
        .ok_or_else(|| VaultError::AuthorityDiscoveryFailed("no authorization parameter".into()))?;
    let resource = extract_quoted(header, "resource")
        .ok_or_else(|| VaultError::AuthorityDiscoveryFailed("no resource parameter".into()))?;
    Ok((authorization, resource))
}

fn extract_quoted(header: &str, key: &str) -> Option<String> {
    let needle = format!("{}=\"", key);
    let start = header.find(&needle)? + needle.len();
    let rest = &header[start..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

fn validate_key_uri(key_uri: &str) -> Result<(), VaultError> {
    let url = url::Url::parse(key_uri).map_err(|_| VaultError::InvalidKeyUri(key_uri.to_string()))?;
    if url.scheme() != "https" {
        return Err(VaultError::InvalidKeyUri(key_uri.to_string()));
    }
    let segments: Vec<&str> = url.path().split('/').collect();
    if segments.len() != 3 && segments.len() != 4 {
        return Err(VaultError::InvalidKeyUri(key_uri.to_string()));
    }
    if !segments[1].eq_ignore_ascii_case("keys") {
        return Err(VaultError::InvalidKeyUri(key_uri.to_string()));
    }
    Ok(())
}

fn validate_base64(input: &str) -> Result<(), VaultError> {
    if input.len() % 4 != 0 {
        return Err(VaultError::InvalidBase64);
    }
    STANDARD.decode(input).map_err(|_| VaultError::InvalidBase64)?;
    Ok(())
}

fn to_base64url(standard_b64: &str) -> Result<String, VaultError> {
    let raw = STANDARD.decode(standard_b64).map_err(|_| VaultError::InvalidBase64)?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(raw))
}

fn from_base64url(b64url: &str) -> Result<String, VaultError> {
    let mut s = b64url.replace('-', "+").replace('_', "/");
    while s.len() % 4 != 0 {
        s.push('=');
    }
    let raw = STANDARD.decode(&s).map_err(|_| VaultError::InvalidBase64)?;
    Ok(STANDARD.encode(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_key_uri_shapes() {
        assert!(validate_key_uri("https://myvault.vault.azure.net/keys/key1").is_ok());
        assert!(validate_key_uri("https://myvault.vault.azure.net/keys/key1/abcdef").is_ok());
        assert!(validate_key_uri("https://myvault.vault.azure.net/secrets/key1").is_err());
        assert!(validate_key_uri("http://myvault.vault.azure.net/keys/key1").is_err());
        assert!(validate_key_uri("not a url").is_err());
    }

    #[test]
    fn base64url_round_trip() {
        let std_b64 = STANDARD.encode(b"hello key vault");
        let url_form = to_base64url(&std_b64).unwrap();
        assert!(!url_form.contains('+'));
        assert!(!url_form.contains('/'));
        let back = from_base64url(&url_form).unwrap();
        assert_eq!(back, std_b64);
    }

    #[test]
    fn rejects_malformed_base64() {
        assert!(validate_base64("not-valid-base64!!").is_err());
        assert!(validate_base64("abc").is_err());
    }

    #[test]
    fn parses_bearer_challenge() {
        let header = r#"Bearer authorization="https://login.microsoftonline.com/tenant", resource="https://vault.azure.net""#;
        let (authority, resource) = parse_bearer_challenge(header).unwrap();
        assert_eq!(authority, "https://login.microsoftonline.com/tenant");
        assert_eq!(resource, "https://vault.azure.net");
    }
}
