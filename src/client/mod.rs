#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::AssistantError;
use crate::config::{API_KEY_VAR, ApiKey, Config};

/// Failure of a call to the remote embedding or completion service
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("No API credential configured (set {API_KEY_VAR} or add it to .env)")]
    MissingCredential,
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Service returned HTTP {code}: {message}")]
    Status { code: u16, message: String },
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Completion response contained no choices")]
    NoChoices,
    #[error("Embedding response contained no vector")]
    EmptyEmbedding,
    #[error("Embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl From<ServiceError> for AssistantError {
    #[inline]
    fn from(error: ServiceError) -> Self {
        Self::Service(error.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub owned_by: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<ModelInfo>,
}

/// Blocking client for an OpenAI-compatible HTTP API.
///
/// Every call is a single request: there is no retry or backoff, failures are
/// returned to the caller as [`ServiceError`].
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    pub(crate) base_url: Url,
    pub(crate) embedding_model: String,
    pub(crate) completion_model: String,
    pub(crate) embedding_dimension: usize,
    api_key: Option<ApiKey>,
    agent: ureq::Agent,
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

impl OpenAiClient {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .api_url()
            .context("Failed to generate API URL from config")?;

        Ok(Self {
            base_url,
            embedding_model: config.openai.embedding_model.clone(),
            completion_model: config.openai.completion_model.clone(),
            embedding_dimension: config.openai.embedding_dimension as usize,
            api_key: config.api_key.clone(),
            agent: build_agent(Duration::from_secs(config.openai.timeout_seconds)),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn with_api_key(mut self, api_key: Option<ApiKey>) -> Self {
        self.api_key = api_key;
        self
    }

    #[inline]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Verify the service is reachable and accepts the credential by listing models
    #[inline]
    pub fn check_connection(&self) -> Result<Vec<ModelInfo>, ServiceError> {
        let models: ModelsResponse = self.get_json("models")?;
        debug!("Service lists {} models", models.data.len());
        Ok(models.data)
    }

    pub(crate) fn post_json<T, R>(&self, endpoint: &str, body: &T) -> Result<R, ServiceError>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let authorization = self.authorization()?;
        let url = self.endpoint(endpoint)?;

        let request_json = serde_json::to_string(body)
            .map_err(|e| ServiceError::Transport(format!("Failed to serialize request: {}", e)))?;

        debug!("POST {} ({} bytes)", url, request_json.len());

        let mut response = self
            .agent
            .post(url.as_str())
            .header("Authorization", authorization)
            .header("Content-Type", "application/json")
            .send(&request_json)
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(transport_error)?;

        decode_response(status, &text)
    }

    fn get_json<R: DeserializeOwned>(&self, endpoint: &str) -> Result<R, ServiceError> {
        let authorization = self.authorization()?;
        let url = self.endpoint(endpoint)?;

        debug!("GET {}", url);

        let mut response = self
            .agent
            .get(url.as_str())
            .header("Authorization", authorization)
            .call()
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(transport_error)?;

        decode_response(status, &text)
    }

    fn authorization(&self) -> Result<String, ServiceError> {
        self.api_key
            .as_ref()
            .map(|key| format!("Bearer {}", key.expose()))
            .ok_or(ServiceError::MissingCredential)
    }

    fn endpoint(&self, endpoint: &str) -> Result<Url, ServiceError> {
        self.base_url
            .join(endpoint)
            .map_err(|e| ServiceError::Transport(format!("Failed to build {} URL: {}", endpoint, e)))
    }
}

fn transport_error(error: ureq::Error) -> ServiceError {
    match &error {
        ureq::Error::Timeout(_) => warn!("Request timed out: {}", error),
        ureq::Error::ConnectionFailed | ureq::Error::HostNotFound | ureq::Error::Io(_) => {
            warn!("Transport error: {}", error);
        }
        _ => warn!("Request error: {}", error),
    }
    ServiceError::Transport(error.to_string())
}

/// Map an HTTP status and body to the expected payload or a structured error
pub(crate) fn decode_response<R: DeserializeOwned>(
    status: u16,
    body: &str,
) -> Result<R, ServiceError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<ErrorEnvelope>(body)
            .map_or_else(|_| body.trim().to_string(), |envelope| envelope.error.message);
        warn!("Service returned HTTP {}: {}", status, message);
        return Err(ServiceError::Status {
            code: status,
            message,
        });
    }

    serde_json::from_str(body).map_err(|e| ServiceError::MalformedResponse(e.to_string()))
}
