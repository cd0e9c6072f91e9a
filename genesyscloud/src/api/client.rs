use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::auth::{Credentials, TokenSource};
use super::common::{ApiErrorDetails, ApiErrorResponse, ApiQueryParams};
use super::error::ApiError;

/// Genesys Cloud API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    auth: TokenSource,
    retry_config: RetryConfig,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
        }
    }
}

impl Client {
    /// Create a new API client with default configuration
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self, ApiError> {
        Self::with_config(base_url, credentials, RetryConfig::default())
    }

    /// Create a new API client with custom retry configuration
    pub fn with_config(
        base_url: &str,
        credentials: Credentials,
        retry_config: RetryConfig,
    ) -> Result<Self, ApiError> {
        url::Url::parse(base_url)
            .map_err(|e| ApiError::Configuration(format!("invalid API URL {}: {}", base_url, e)))?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(retry_config.timeout_seconds))
            .user_agent(concat!("genesyscloud-rs/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url: base_url.trim_end_matches('/').to_string(),
                auth: TokenSource::new(credentials),
                retry_config,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Integrations API operations
    pub fn integrations(&self) -> crate::api::integrations::IntegrationsApi<'_> {
        crate::api::integrations::IntegrationsApi::new(self)
    }

    /// Recording API operations
    pub fn recording(&self) -> crate::api::recording::RecordingApi<'_> {
        crate::api::recording::RecordingApi::new(self)
    }

    /// Execute a GET request with retry logic
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        tracing::debug!("GET request to: {}", url);
        self.execute_with_retry(|| self.inner.http_client.get(&url), path)
            .await
    }

    /// Execute a GET request with query parameters
    pub async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &ApiQueryParams,
    ) -> Result<T, ApiError> {
        let full_path = format!("{}{}", path, params.to_query_string());
        self.get(&full_path).await
    }

    /// Execute a POST request with retry logic
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        tracing::debug!("POST request to: {}", url);
        self.execute_with_retry(|| self.inner.http_client.post(&url).json(body), path)
            .await
    }

    /// Execute a PUT request with retry logic
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        tracing::debug!("PUT request to: {}", url);
        self.execute_with_retry(|| self.inner.http_client.put(&url).json(body), path)
            .await
    }

    /// Execute a PATCH request with retry logic
    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        tracing::debug!("PATCH request to: {}", url);
        self.execute_with_retry(|| self.inner.http_client.patch(&url).json(body), path)
            .await
    }

    /// Execute a DELETE request with retry logic
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let url = self.url(path);
        tracing::debug!("DELETE request to: {}", url);
        self.execute_with_retry::<_, serde_json::Value>(
            || self.inner.http_client.delete(&url),
            path,
        )
        .await
        .map(|_| ())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path)
    }

    /// Execute request with retry logic
    async fn execute_with_retry<F, T>(&self, request_fn: F, path: &str) -> Result<T, ApiError>
    where
        F: Fn() -> reqwest::RequestBuilder,
        T: DeserializeOwned,
    {
        let config = &self.inner.retry_config;
        let mut attempt = 0;
        let mut last_error = None;
        let mut retry_after: Option<u64> = None;

        while attempt <= config.max_retries {
            if attempt > 0 {
                let exponential = std::cmp::min(
                    config
                        .initial_backoff_ms
                        .saturating_mul(2_u64.saturating_pow(attempt - 1)),
                    config.max_backoff_ms,
                );
                let backoff = retry_after
                    .take()
                    .map(|ms| ms.clamp(exponential, config.max_backoff_ms))
                    .unwrap_or(exponential);
                tracing::debug!(
                    "Retrying request to {} after {}ms (attempt {})",
                    path,
                    backoff,
                    attempt
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let auth_header = self
                .inner
                .auth
                .authorization(&self.inner.http_client)
                .await?;

            match request_fn()
                .header(AUTHORIZATION, auth_header)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return self.parse_success_response(response).await;
                    }

                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        self.inner.auth.invalidate().await;
                        let text = response.text().await.unwrap_or_default();
                        return Err(ApiError::Authentication(text));
                    }

                    if status == reqwest::StatusCode::NOT_FOUND {
                        let message = response.text().await.unwrap_or_default();
                        tracing::debug!("{} returned 404", path);
                        return Err(ApiError::NotFound {
                            path: path.to_string(),
                            message,
                        });
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        retry_after = response
                            .headers()
                            .get(RETRY_AFTER)
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .map(|secs| secs.saturating_mul(1000));
                        tracing::warn!("Rate limited on {}", path);
                        last_error = Some(ApiError::RateLimited);
                    } else if status.is_server_error() {
                        tracing::warn!("{} returned HTTP {}", path, status.as_u16());
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else if status == reqwest::StatusCode::CONFLICT {
                        tracing::warn!("Conflict on {}", path);
                        last_error = self.handle_error_response::<()>(response).await.err();
                    } else {
                        return self.handle_error_response(response).await;
                    }
                }
                Err(e) => {
                    if e.is_timeout() {
                        last_error = Some(ApiError::Timeout(config.timeout_seconds));
                    } else if e.is_connect() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::Request(e));
                    }
                }
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    /// Parse successful response
    async fn parse_success_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        tracing::trace!("API response body: {}", text);

        let body = if text.trim().is_empty() { "null" } else { &text };
        serde_json::from_str::<T>(body).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::Parse(format!("Failed to parse response: {}", e))
        })
    }

    /// Handle error response
    async fn handle_error_response<T>(&self, response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let (message, details) = match serde_json::from_str::<ApiErrorResponse>(&text) {
            Ok(err_resp) => (
                err_resp.message.unwrap_or_else(|| text.clone()),
                Some(Box::new(ApiErrorDetails {
                    code: err_resp.code,
                    context_id: err_resp.context_id,
                })),
            ),
            Err(_) => (text, None),
        };

        Err(ApiError::Api {
            status,
            message,
            details,
        })
    }
}
