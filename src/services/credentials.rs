use crate::config::Config;
use crate::constants::gcp;
use crate::errors::ClientError;
use crate::services::logger::Logger;
use crate::services::transport::{HttpRequest, HttpTransport};
use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Yields the API key for one tool invocation.
///
/// Every failure to produce a key is a [`ClientError::Configuration`]; callers
/// treat it as terminal and never retry.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn resolve(&self) -> Result<String, ClientError>;
}

/// A key handed over directly through configuration.
pub struct StaticCredentialSource {
    key: String,
}

impl StaticCredentialSource {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

#[async_trait]
impl CredentialSource for StaticCredentialSource {
    async fn resolve(&self) -> Result<String, ClientError> {
        Ok(self.key.clone())
    }
}

/// Used when neither a key nor a secret location is configured.
pub struct UnconfiguredSource;

#[async_trait]
impl CredentialSource for UnconfiguredSource {
    async fn resolve(&self) -> Result<String, ClientError> {
        Err(ClientError::configuration(
            "Jules API key not found: neither JULES_API_KEY nor GOOGLE_CLOUD_PROJECT is set",
        ))
    }
}

/// Reads the latest version of a Google Secret Manager secret, authenticating
/// with the instance's service account through the metadata server.
pub struct SecretManagerSource {
    logger: Logger,
    transport: Arc<dyn HttpTransport>,
    project_id: String,
    secret_name: String,
    timeout: Duration,
    metadata_url: String,
    secret_manager_url: String,
}

impl SecretManagerSource {
    pub fn new(
        logger: Logger,
        transport: Arc<dyn HttpTransport>,
        project_id: &str,
        secret_name: &str,
        timeout: Duration,
    ) -> Self {
        Self {
            logger: logger.child("secrets"),
            transport,
            project_id: project_id.to_string(),
            secret_name: secret_name.to_string(),
            timeout,
            metadata_url: gcp::METADATA_TOKEN_URL.to_string(),
            secret_manager_url: gcp::SECRET_MANAGER_BASE_URL.to_string(),
        }
    }

    /// Points both lookups somewhere else (emulators, tests).
    pub fn with_endpoints(mut self, metadata_url: &str, secret_manager_url: &str) -> Self {
        self.metadata_url = metadata_url.to_string();
        self.secret_manager_url = secret_manager_url.trim_end_matches('/').to_string();
        self
    }

    pub fn secret_version_url(&self) -> String {
        format!(
            "{}/projects/{}/secrets/{}/versions/latest:access",
            self.secret_manager_url, self.project_id, self.secret_name
        )
    }

    async fn get_json(&self, url: &str, headers: HeaderMap) -> Result<Value, ClientError> {
        let request = HttpRequest::new(Method::GET, url, self.timeout).with_headers(headers);
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(ClientError::Backend {
                status: response.status,
                body: response.body,
            });
        }
        serde_json::from_str(&response.body)
            .map_err(|err| ClientError::transport(format!("malformed response body: {}", err)))
    }

    async fn access_token(&self) -> Result<String, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(gcp::METADATA_FLAVOR_HEADER, HeaderValue::from_static("Google"));
        let token = self.get_json(&self.metadata_url, headers).await?;
        token
            .get("access_token")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ClientError::transport("metadata server returned no access_token"))
    }

    async fn fetch(&self) -> Result<String, ClientError> {
        let token = self.access_token().await?;
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ClientError::transport("access token is not a valid header value"))?;
        headers.insert(AUTHORIZATION, bearer);

        let version = self.get_json(&self.secret_version_url(), headers).await?;
        let encoded = version
            .get("payload")
            .and_then(|p| p.get("data"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| ClientError::transport("secret version has no payload.data"))?;
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|err| ClientError::transport(format!("payload.data is not base64: {}", err)))?;
        String::from_utf8(decoded)
            .map(|s| s.trim().to_string())
            .map_err(|_| ClientError::transport("secret payload is not valid UTF-8"))
    }
}

#[async_trait]
impl CredentialSource for SecretManagerSource {
    async fn resolve(&self) -> Result<String, ClientError> {
        self.fetch().await.map_err(|err| {
            self.logger.error(
                &format!("Failed to retrieve secret {}", self.secret_name),
                Some(&serde_json::json!({ "error": err.to_string() })),
            );
            ClientError::configuration(format!(
                "Failed to retrieve secret {} in project {}: {}",
                self.secret_name, self.project_id, err
            ))
        })
    }
}

struct CachedCredential {
    value: String,
    expires_at: Instant,
}

/// Keeps a successfully resolved key for at most `ttl`. Failures and empty
/// keys are never cached.
pub struct CachedCredentialSource {
    inner: Arc<dyn CredentialSource>,
    ttl: Duration,
    entry: Mutex<Option<CachedCredential>>,
}

impl CachedCredentialSource {
    pub fn new(inner: Arc<dyn CredentialSource>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entry: Mutex::new(None),
        }
    }

    fn cached(&self) -> Option<String> {
        let guard = self.entry.lock().ok()?;
        let entry = guard.as_ref()?;
        if Instant::now() >= entry.expires_at {
            return None;
        }
        Some(entry.value.clone())
    }

    fn store(&self, value: &str) {
        if let Ok(mut guard) = self.entry.lock() {
            *guard = Some(CachedCredential {
                value: value.to_string(),
                expires_at: Instant::now() + self.ttl,
            });
        }
    }
}

#[async_trait]
impl CredentialSource for CachedCredentialSource {
    async fn resolve(&self) -> Result<String, ClientError> {
        if let Some(value) = self.cached() {
            return Ok(value);
        }
        let value = self.inner.resolve().await?;
        if !value.trim().is_empty() {
            self.store(&value);
        }
        Ok(value)
    }
}

/// Picks the credential source described by `config`: a direct key wins, a
/// project id selects Secret Manager, otherwise every resolution fails.
pub fn from_config(
    config: &Config,
    logger: &Logger,
    transport: Arc<dyn HttpTransport>,
) -> Arc<dyn CredentialSource> {
    let source: Arc<dyn CredentialSource> = if let Some(key) = &config.api_key {
        Arc::new(StaticCredentialSource::new(key.clone()))
    } else if let Some(project) = &config.project_id {
        Arc::new(SecretManagerSource::new(
            logger.clone(),
            transport,
            project,
            &config.secret_name,
            config.timeout(),
        ))
    } else {
        logger.warn(
            "GOOGLE_CLOUD_PROJECT not set and JULES_API_KEY not provided; tool calls will fail",
            None,
        );
        Arc::new(UnconfiguredSource)
    };

    if config.credential_ttl_ms > 0 {
        Arc::new(CachedCredentialSource::new(
            source,
            Duration::from_millis(config.credential_ttl_ms),
        ))
    } else {
        source
    }
}
