//! API client for communicating with the prediction service

use anyhow::{Context, Result};
use renewal_lib::{HealthResponse, PolicyAttributes, PredictionResult};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the prediction service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send_get(path).await?;
        Self::decode(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    /// Service banner from `/`
    pub async fn banner(&self) -> Result<RootMessage> {
        self.get("").await
    }

    /// Request a renewal prediction
    pub async fn predict(&self, attrs: &PolicyAttributes) -> Result<PredictionResult> {
        self.post("predict", attrs).await
    }

    /// Component health; the body is returned for 503 responses as well
    pub async fn health(&self) -> Result<(StatusCode, HealthResponse)> {
        let response = self.send_get("healthz").await?;
        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::SERVICE_UNAVAILABLE {
            return Err(Self::api_error(response).await);
        }
        let health = response
            .json()
            .await
            .context("Failed to parse response")?;
        Ok((status, health))
    }

    async fn send_get(&self, path: &str) -> Result<Response> {
        let url = self.base_url.join(path).context("Invalid path")?;

        self.client
            .get(url)
            .send()
            .await
            .context("Failed to send request")
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        response.json().await.context("Failed to parse response")
    }

    async fn api_error(response: Response) -> anyhow::Error {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.detail.to_string())
            .unwrap_or(body);
        anyhow::anyhow!("API error ({}): {}", status, message)
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootMessage {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: serde_json::Value,
}
