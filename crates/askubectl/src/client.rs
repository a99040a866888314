//! HTTP client for the askubed API.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use askube_shared::{ErrorResponse, HealthResponse, NamespacesResponse, QueryResponse};
use serde_json::json;

/// Answers can take two model round trips; everything else is quick.
const ASK_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct DaemonClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl DaemonClient {
    pub fn new(base_url: String) -> Self {
        Self {
            http_client: reqwest::Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn ask(&self, question: &str) -> Result<QueryResponse> {
        let response = self
            .http_client
            .post(format!("{}/query", self.base_url))
            .timeout(ASK_TIMEOUT)
            .json(&json!({ "query": question }))
            .send()
            .await
            .context("Is askubed running?")?;

        Self::parse(response).await
    }

    pub async fn namespaces(&self) -> Result<Vec<String>> {
        let response = self
            .http_client
            .get(format!("{}/test_connection", self.base_url))
            .send()
            .await
            .context("Is askubed running?")?;

        let body: NamespacesResponse = Self::parse(response).await?;
        Ok(body.namespaces)
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self
            .http_client
            .get(format!("{}/v1/health", self.base_url))
            .send()
            .await
            .context("Is askubed running?")?;

        Self::parse(response).await
    }

    /// Decode a success body, or surface the daemon's error message.
    async fn parse<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .context("Failed to parse daemon response");
        }

        match response.json::<ErrorResponse>().await {
            Ok(body) => Err(anyhow!("{}", body.error)),
            Err(_) => Err(anyhow!("daemon returned {}", status)),
        }
    }
}
