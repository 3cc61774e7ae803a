use async_trait::async_trait;
use log::{debug, error, warn};
use rand::Rng;
use reqwest::{Client, StatusCode, header};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::app_config::TranslationConfig;
use crate::errors::ProviderError;
use crate::providers::{Provider, TranslateRequest};

/// DeepL client for the `/v2/translate` REST API
#[derive(Debug)]
pub struct DeepL {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// Base URL, without the `/v2` path
    base_url: String,
    /// Maximum number of retry attempts
    max_retries: u32,
    /// Base backoff time in milliseconds for exponential backoff
    backoff_base_ms: u64,
    /// Optional rate limit in requests per minute
    rate_limit: Option<u32>,
    /// Start of the previous request, for rate limiting across workers
    last_request: Mutex<Option<Instant>>,
}

/// Translate request body
#[derive(Debug, Serialize)]
pub struct DeepLRequest<'a> {
    text: Vec<&'a str>,
    target_lang: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_lang: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    glossary_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a str>,
}

impl<'a> DeepLRequest<'a> {
    pub fn from_request(request: &'a TranslateRequest) -> Self {
        Self {
            text: vec![request.text.as_str()],
            target_lang: &request.target_language,
            source_lang: request.source_language.as_deref(),
            glossary_id: request.glossary_id.as_deref(),
            context: request.context.as_deref(),
        }
    }
}

/// Translate response body
#[derive(Debug, Deserialize)]
pub struct DeepLResponse {
    pub translations: Vec<DeepLTranslation>,
}

#[derive(Debug, Deserialize)]
pub struct DeepLTranslation {
    #[serde(default)]
    pub detected_source_language: Option<String>,
    pub text: String,
}

/// Usage response body
#[derive(Debug, Deserialize)]
pub struct DeepLUsage {
    #[serde(default)]
    pub character_count: u64,
    #[serde(default)]
    pub character_limit: u64,
}

impl DeepL {
    /// Create a new DeepL client with default retry settings
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::new_with_config(api_key, base_url, 30, 3, 1000, None)
    }

    /// Create a new DeepL client with configuration
    pub fn new_with_config(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_ms: u64,
        rate_limit: Option<u32>,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .pool_idle_timeout(Duration::from_secs(90))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_retries,
            backoff_base_ms,
            rate_limit,
            last_request: Mutex::new(None),
        }
    }

    /// Create a client from the translation section of the configuration
    pub fn from_config(config: &TranslationConfig) -> Self {
        Self::new_with_config(
            config.api_key.clone(),
            config.get_endpoint(),
            config.timeout_secs,
            config.retry_count,
            config.retry_backoff_ms,
            config.rate_limit,
        )
    }

    fn auth_header(&self) -> String {
        format!("DeepL-Auth-Key {}", self.api_key)
    }

    /// Wait until the configured rate limit allows another request
    async fn pace(&self) {
        let Some(rate_limit) = self.rate_limit.filter(|r| *r > 0) else {
            return;
        };
        let interval = Duration::from_millis(60_000 / rate_limit as u64);

        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < interval {
                tokio::time::sleep(interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let backoff_ms = self.backoff_base_ms * (1u64 << (attempt - 1).min(16));
        let jitter_ms = if self.backoff_base_ms > 1 {
            rand::rng().random_range(0..=self.backoff_base_ms / 2)
        } else {
            0
        };
        Duration::from_millis(backoff_ms + jitter_ms)
    }

    /// Send one translate request without retrying
    async fn send_once(&self, request: &TranslateRequest) -> Result<String, ProviderError> {
        self.pace().await;

        let url = format!("{}/v2/translate", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, self.auth_header())
            .json(&DeepLRequest::from_request(request))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            return Err(map_status_error(status, &body, retry_after.as_deref()));
        }

        let parsed = response
            .json::<DeepLResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Invalid DeepL response: {}", e)))?;

        let translation = parsed.translations.into_iter().next().ok_or_else(|| {
            ProviderError::ParseError("DeepL response contains no translations".to_string())
        })?;
        if let Some(detected) = &translation.detected_source_language {
            debug!("DeepL detected source language {}", detected);
        }

        Ok(translation.text)
    }
}

/// Map a reqwest transport failure to a provider error
fn map_transport_error(error: reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout(error.to_string())
    } else {
        ProviderError::ConnectionError(error.to_string())
    }
}

/// Map a non-success HTTP status to a provider error
pub fn map_status_error(status: StatusCode, body: &str, retry_after: Option<&str>) -> ProviderError {
    match status.as_u16() {
        403 => ProviderError::AuthenticationError(format!("DeepL rejected the API key: {}", body)),
        429 => ProviderError::RateLimitExceeded(match retry_after {
            Some(seconds) => format!("retry after {}s: {}", seconds, body),
            None => body.to_string(),
        }),
        456 => ProviderError::ApiError {
            status_code: 456,
            message: format!("DeepL character quota exceeded: {}", body),
        },
        code => ProviderError::ApiError {
            status_code: code,
            message: body.to_string(),
        },
    }
}

#[async_trait]
impl Provider for DeepL {
    async fn translate(&self, request: TranslateRequest) -> Result<String, ProviderError> {
        let mut attempt = 0;

        loop {
            match self.send_once(&request).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        "DeepL request failed: {} - retrying in {} ms (attempt {}/{})",
                        e,
                        delay.as_millis(),
                        attempt + 1,
                        self.max_retries + 1
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!("DeepL request failed after {} attempt(s): {}", attempt + 1, e);
                    return Err(e);
                }
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let url = format!("{}/v2/usage", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, &body, None));
        }

        let usage = response
            .json::<DeepLUsage>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Invalid DeepL usage response: {}", e)))?;
        debug!(
            "DeepL usage: {}/{} characters",
            usage.character_count, usage.character_limit
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "DeepL"
    }
}
