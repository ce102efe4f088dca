//! HTTP client for the acervo document API.
//!
//! Provides a minimal client with configurable auth (Bearer token or X-API-Key), generic
//! request helpers, and the `DocumentTransport` implementation used by the services and CLI.

pub mod api;
mod progress;

use std::time::Duration;

use acervo_core::{AcervoConfig, AppError, AppResult};
use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

/// Authentication strategy for the API.
#[derive(Clone, Debug)]
pub enum Auth {
    /// `Authorization: Bearer {token}`
    Bearer(String),
    /// `X-API-Key: {key}`
    XApiKey(String),
    /// No credentials (local development servers)
    None,
}

/// HTTP client for the document API with configurable auth.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Auth,
}

impl ApiClient {
    /// Build a client. No request-level timeout is set here; callers apply their own deadlines.
    pub fn new(base_url: impl Into<String>, auth: Auth) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// Client for `ACERVO_API_URL` using the configured bearer token.
    pub fn from_config(config: &AcervoConfig) -> Result<Self> {
        let token = config.require_token()?;
        Self::new(config.api_url.clone(), Auth::Bearer(token.to_string()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Auth::Bearer(token) => request.header("Authorization", format!("Bearer {}", token)),
            Auth::XApiKey(key) => request.header("X-API-Key", key.as_str()),
            Auth::None => request,
        }
    }

    /// Send a request with auth applied and turn non-success statuses into `AppError`.
    async fn send(&self, request: RequestBuilder) -> AppResult<Response> {
        let response = self
            .apply_auth(request)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await
    }

    /// GET request with optional query parameters. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> AppResult<T> {
        let mut request = self.client.get(self.build_url(path));
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = self.send(request).await?;
        parse_json(response).await
    }

    /// PATCH JSON body and deserialize response.
    pub async fn patch_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> AppResult<T> {
        let request = self.client.patch(self.build_url(path)).json(body);
        let response = self.send(request).await?;
        parse_json(response).await
    }

    /// POST multipart form and deserialize response.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> AppResult<T> {
        let request = self.client.post(self.build_url(path)).multipart(form);
        let response = self.send(request).await?;
        parse_json(response).await
    }

    /// DELETE request. Returns Ok(()) on success.
    pub async fn delete(&self, path: &str) -> AppResult<()> {
        let request = self.client.delete(self.build_url(path));
        self.send(request).await?;
        Ok(())
    }

    /// Raw client for custom requests. Caller must apply auth via build_url and headers.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

fn transport_error(err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::Transport(format!("Request timed out: {}", err))
    } else {
        AppError::Transport(format!("Failed to send request: {}", err))
    }
}

async fn check_status(response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    let message = server_message(&error_text);
    tracing::debug!(status = status.as_u16(), message = %message, "API request failed");
    Err(AppError::from_status(status.as_u16(), message))
}

/// Prefer the `message` (or `error`) field of a JSON error body, else the raw text.
fn server_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .or_else(|| value.get("error"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                "Unknown error".to_string()
            } else {
                body.trim().to_string()
            }
        })
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> AppResult<T> {
    let body = response.bytes().await.map_err(transport_error)?;
    serde_json::from_slice(&body).map_err(|e| {
        AppError::Transport(format!("Failed to parse response as JSON: {}", e))
    })
}
