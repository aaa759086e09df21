use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::common::{ApiErrorDetails, ApiErrorResponse, ApiQueryParams};
use super::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "https://api.fastly.com";

const API_KEY_HEADER: &str = "Fastly-Key";

/// Fastly API client. Cheap to clone; every request is sent exactly once.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
}

#[derive(Clone)]
pub struct ClientConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            user_agent: format!("terraform-provider-fastly/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Client {
    /// Create a new API client with default configuration
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, ApiError> {
        Self::with_config(base_url, api_key, ClientConfig::default())
    }

    pub fn with_config(base_url: &str, api_key: &str, config: ClientConfig) -> Result<Self, ApiError> {
        url::Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key).map_err(|_| ApiError::AuthError)?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Ok(ua) = HeaderValue::from_str(&config.user_agent) {
            headers.insert(USER_AGENT, ua);
        }

        let http_client = reqwest::ClientBuilder::new()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url: base_url.trim_end_matches('/').to_string(),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// TLS certificate and configuration operations
    pub fn tls(&self) -> crate::api::tls::TlsApi<'_> {
        crate::api::tls::TlsApi::new(self)
    }

    /// Alert definition operations
    pub fn alerts(&self) -> crate::api::alerts::AlertsApi<'_> {
        crate::api::alerts::AlertsApi::new(self)
    }

    /// Next-Gen WAF operations
    pub fn ngwaf(&self) -> crate::api::ngwaf::NgwafApi<'_> {
        crate::api::ngwaf::NgwafApi::new(self)
    }

    pub async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(Method::GET, path, None::<&()>).await?;
        self.parse_success_response(response).await
    }

    pub async fn get_with_params<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &ApiQueryParams,
    ) -> Result<T, ApiError> {
        let full_path = format!("{}{}", path, params.to_query_string());
        self.get(&full_path).await
    }

    pub async fn post<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.send(Method::POST, path, Some(body)).await?;
        self.parse_success_response(response).await
    }

    pub async fn put<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.send(Method::PUT, path, Some(body)).await?;
        self.parse_success_response(response).await
    }

    pub async fn patch<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.send(Method::PATCH, path, Some(body)).await?;
        self.parse_success_response(response).await
    }

    /// DELETE ignores any response body
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(Method::DELETE, path, None::<&()>).await?;
        Ok(())
    }

    async fn send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}{}", self.inner.base_url, path);
        tracing::debug!("{} request to: {}", method, url);

        let mut request = self.inner.http_client.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("Response status: {}", status);

        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::AuthError),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(path.to_string())),
            StatusCode::TOO_MANY_REQUESTS => Err(ApiError::RateLimited),
            s if s.is_server_error() => Err(ApiError::ServiceUnavailable(s.as_u16())),
            _ => Err(self.handle_error_response(response).await),
        }
    }

    async fn parse_success_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        tracing::debug!("API response body: {}", text);

        let body = if text.trim().is_empty() { "null" } else { &text };
        serde_json::from_str::<T>(body).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::ParseError(format!("Failed to parse response: {}", e))
        })
    }

    async fn handle_error_response(&self, response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        tracing::error!("API error response ({}): {}", status, text);

        let details = serde_json::from_str::<ApiErrorResponse>(&text)
            .ok()
            .map(|resp| Box::new(ApiErrorDetails::from(resp)));

        ApiError::ApiError {
            status,
            message: text,
            details,
        }
    }
}
