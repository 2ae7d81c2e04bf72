//! Gateway client: the single point of outbound HTTP.
//!
//! Attaches the bearer token from `CoreState`, applies the uniform request
//! timeout, classifies failures into [`ApiError`] and performs the global
//! side effects (session expiry, user notifications) in one place.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::{classify_status, extract_message, ApiError};
use crate::config;
use crate::core_state::CoreState;
use crate::notify::{Notification, Notifier};

/// Per-request switches for the global error handling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Caller reports failures itself; no global notifications.
    pub silent: bool,
    /// A 401 means rejected credentials: the stored identity is cleared
    /// but no expiry is announced.
    pub credential_check: bool,
}

impl RequestOptions {
    pub fn silent() -> Self {
        Self {
            silent: true,
            ..Self::default()
        }
    }

    pub fn credential_check() -> Self {
        Self {
            credential_check: true,
            ..Self::default()
        }
    }
}

/// Request payload.
pub enum Body {
    Empty,
    Json(serde_json::Value),
    Multipart(reqwest::multipart::Form),
}

impl Body {
    pub fn json<B: Serialize + ?Sized>(body: &B) -> Result<Self, ApiError> {
        serde_json::to_value(body)
            .map(Body::Json)
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// HTTP client for the clinic backend.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    core: Arc<CoreState>,
    notifier: Arc<dyn Notifier>,
}

impl ApiClient {
    /// Create a client for `base_url` with the standard request timeout.
    pub fn new(
        base_url: &str,
        core: Arc<CoreState>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, config::REQUEST_TIMEOUT, core, notifier)
    }

    pub fn with_timeout(
        base_url: &str,
        timeout: Duration,
        core: Arc<CoreState>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("{}/{}", config::APP_NAME, config::APP_VERSION))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            core,
            notifier,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Server origin used for static assets (base URL without the `/api` suffix).
    pub fn origin(&self) -> &str {
        self.base_url
            .strip_suffix("/api")
            .unwrap_or(&self.base_url)
    }

    pub fn core(&self) -> &Arc<CoreState> {
        &self.core
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub fn notify(&self, notification: Notification) {
        self.notifier.notify(notification);
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    // ── Core request ────────────────────────────────────────

    /// Send one request and classify the outcome.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Body,
        options: RequestOptions,
    ) -> Result<reqwest::Response, ApiError> {
        let mut req = self.http.request(method.clone(), self.url(path));
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(token) = self.core.token() {
            req = req.bearer_auth(token);
        }
        req = match body {
            Body::Empty => req,
            Body::Json(value) => req.json(&value),
            Body::Multipart(form) => req.multipart(form),
        };

        tracing::debug!(%method, path, "API request");

        let response = match req.send().await {
            Ok(response) => response,
            Err(e) => {
                let err = if e.is_timeout() {
                    ApiError::Timeout(self.timeout.as_secs())
                } else {
                    ApiError::Network(e.to_string())
                };
                tracing::warn!(%method, path, error = %err, "API request failed without response");
                self.handle_failure(&err, options);
                return Err(err);
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = classify_status(status, extract_message(status, &body), path, options.credential_check);
        tracing::warn!(%method, path, status = status.as_u16(), error = %err, "API request rejected");
        self.handle_failure(&err, options);
        Err(err)
    }

    /// Global side effects of a classified failure.
    fn handle_failure(&self, err: &ApiError, options: RequestOptions) {
        match err {
            ApiError::SessionExpired => {
                self.core.expire();
                if !options.silent {
                    self.notify(Notification::SessionExpired);
                }
            }
            ApiError::RequestFailed { status: 401, .. } if options.credential_check => {
                self.core.reject_credentials();
            }
            ApiError::RateLimited if !options.silent => {
                self.notify(Notification::RateLimited);
            }
            ApiError::Network(_) | ApiError::Timeout(_) if !options.silent => {
                self.notify(Notification::NetworkError);
            }
            _ => {}
        }
    }

    // ── Typed helpers ───────────────────────────────────────

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Network(e.to_string())
            } else if status == StatusCode::NO_CONTENT {
                ApiError::Decode("empty response body".into())
            } else {
                ApiError::Decode(e.to_string())
            }
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.get_json_with(path, &[], RequestOptions::default()).await
    }

    pub async fn get_json_with<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let response = self
            .request(Method::GET, path, query, Body::Empty, options)
            .await?;
        Self::decode(response).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.post_json_with(path, body, RequestOptions::default()).await
    }

    pub async fn post_json_with<B, T>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::POST, path, &[], Body::json(body)?, options)
            .await?;
        Self::decode(response).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::PUT, path, &[], Body::json(body)?, RequestOptions::default())
            .await?;
        Self::decode(response).await
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, ApiError> {
        let response = self
            .request(Method::POST, path, &[], Body::Multipart(form), RequestOptions::default())
            .await?;
        Self::decode(response).await
    }

    pub async fn put_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, ApiError> {
        let response = self
            .request(Method::PUT, path, &[], Body::Multipart(form), RequestOptions::default())
            .await?;
        Self::decode(response).await
    }

    /// DELETE, ignoring whatever confirmation body the server sends.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.request(Method::DELETE, path, &[], Body::Empty, RequestOptions::default())
            .await?;
        Ok(())
    }

    /// Raw body download (exports, images).
    pub async fn get_bytes(&self, path: &str, options: RequestOptions) -> Result<Vec<u8>, ApiError> {
        let response = self
            .request(Method::GET, path, &[], Body::Empty, options)
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    /// Fetch an absolute URL (asset hosts live outside the API prefix).
    pub async fn fetch_absolute(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, String::new(), url, true));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
