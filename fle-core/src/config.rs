//! Typed engine configuration. Constructed programmatically by the
//! embedder — no config-file parser; the embedding database SDK owns its
//! own configuration surface.

use std::time::Duration;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Base backoff for AAD token retries.
    pub aad_retry_interval: Duration,
    /// Max retry attempts for AAD token acquisition.
    pub aad_retry_count: u32,
    /// Per-request timeout to the key vault.
    pub http_timeout: Duration,
    /// Expiry of settings-cache entries.
    pub settings_ttl: Duration,
    /// Key-vault REST API version string.
    pub api_version: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            aad_retry_interval: Duration::from_millis(500),
            aad_retry_count: 3,
            http_timeout: Duration::from_secs(60),
            settings_ttl: Duration::from_secs(60 * 60),
            api_version: "7.4".to_string(),
        }
    }
}
