//! AAD token provider: certificate client-credentials grant with an
//! in-memory token cache so repeat calls within the token lifetime don't
//! re-hit the authority.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::cert::CertificateCredential;
use crate::error::VaultError;
use crate::retry::RetryPolicy;

/// How much earlier than the token's real expiry we consider it stale, so a
/// caller never races a vault request against a token dying mid-flight.
const EXPIRY_SKEW: Duration = Duration::from_secs(120);

/// JWT bearer client assertion lifetime (RFC 7523): kept short.
const ASSERTION_LIFETIME: Duration = Duration::from_secs(600);

#[derive(Serialize)]
struct AssertionClaims {
    iss: String,
    sub: String,
    aud: String,
    jti: String,
    nbf: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: SystemTime,
}

/// Acquires and caches OAuth2 bearer tokens via the certificate
/// client-credentials flow.
pub struct AadTokenProvider {
    authority: String,
    resource: String,
    credential: Arc<CertificateCredential>,
    retry: RetryPolicy,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl AadTokenProvider {
    pub fn new(
        authority: impl Into<String>,
        resource: impl Into<String>,
        credential: Arc<CertificateCredential>,
        retry_interval: Duration,
        retry_count: u32,
        http: reqwest::Client,
    ) -> Self {
        Self {
            authority: authority.into(),
            resource: resource.into(),
            credential,
            retry: RetryPolicy::new(retry_interval, retry_count),
            http,
            cached: Mutex::new(None),
        }
    }

    /// Returns a bearer token, from cache if still fresh, otherwise by
    /// performing the client-credentials grant. Holding the cache mutex for
    /// the duration of a refresh serializes concurrent callers onto one
    /// network request.
    pub async fn get_access_token(&self, cancel: &CancellationToken) -> Result<String, VaultError> {
        if cancel.is_cancelled() {
            return Err(VaultError::Cancelled);
        }

        let mut guard = self.cached.lock().await;
        if let Some(tok) = guard.as_ref() {
            if tok.expires_at > SystemTime::now() + EXPIRY_SKEW {
                return Ok(tok.access_token.clone());
            }
        }

        let fetched = self
            .retry
            .run(cancel, || async { self.request_token().await.map_err(classify) })
            .await?;

        *guard = Some(fetched.clone());
        Ok(fetched.access_token)
    }

    async fn request_token(&self) -> Result<CachedToken, VaultError> {
        let assertion = self.build_assertion()?;
        let scope = format!("{}/.default", self.resource.trim_end_matches('/'));

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credential.client_id()),
            (
                "client_assertion_type",
                "urn:ietf:params:oauth:client-assertion-type:jwt-bearer",
            ),
            ("client_assertion", assertion.as_str()),
            ("scope", scope.as_str()),
        ];

        let resp = self.http.post(&self.authority).form(&form).send().await.map_err(|e| {
            tracing::warn!(authority = %self.authority, error = %e, "AAD token request failed to send");
            VaultError::AadUnavailable(e.to_string())
        })?;

        let status = resp.status();
        if status.is_success() {
            let body: TokenResponse = resp.json().await.map_err(|e| {
                tracing::error!(authority = %self.authority, error = %e, "AAD token response body unparseable");
                VaultError::AadUnavailable(e.to_string())
            })?;
            Ok(CachedToken {
                access_token: body.access_token,
                expires_at: SystemTime::now() + Duration::from_secs(body.expires_in),
            })
        } else {
            let detail = resp.text().await.unwrap_or_default();
            tracing::error!(authority = %self.authority, client_id = self.credential.client_id(), %status, "AAD rejected the client assertion");
            Err(VaultError::AadUnavailable(format!("{}: {}", status, detail)))
        }
    }

    fn build_assertion(&self) -> Result<String, VaultError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| VaultError::AadUnavailable(e.to_string()))?;

        let claims = AssertionClaims {
            iss: self.credential.client_id().to_string(),
            sub: self.credential.client_id().to_string(),
            aud: self.authority.clone(),
            jti: Uuid::new_v4().to_string(),
            nbf: now.as_secs() as i64,
            exp: (now + ASSERTION_LIFETIME).as_secs() as i64,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.x5t = Some(self.credential.thumbprint_b64url());

        let key: EncodingKey = self
            .credential
            .encoding_key()
            .map_err(|e| VaultError::AadUnavailable(e.to_string()))?;

        encode(&header, &claims, &key).map_err(|e| VaultError::AadUnavailable(e.to_string()))
    }
}

/// Transport/5xx failures are retryable; anything AAD answered with (4xx,
/// malformed body) is not — retrying a rejected assertion just repeats it.
fn classify(err: VaultError) -> (bool, VaultError) {
    let retryable = matches!(&err, VaultError::AadUnavailable(detail) if !looks_like_client_error(detail));
    (retryable, err)
}

fn looks_like_client_error(detail: &str) -> bool {
    detail.starts_with("400") || detail.starts_with("401") || detail.starts_with("403")
}
