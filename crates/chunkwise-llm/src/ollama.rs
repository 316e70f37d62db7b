//! Ollama Provider Implementation
//!
//! Provides integration with Ollama's local LLM API.
//!
//! # Features
//!
//! - Blocking HTTP communication with the `/api/generate` endpoint
//! - JSON-schema constrained output through the `format` field
//! - Retry of refused connections, 429 and 5xx with exponential backoff
//! - Timeouts returned at once, without another attempt
//!
//! The client is blocking. Construct the provider outside of an async
//! runtime and call it from blocking tasks (`tokio::task::spawn_blocking`).
//!
//! # Examples
//!
//! ```no_run
//! use chunkwise_llm::OllamaProvider;
//! use chunkwise_domain::traits::LlmProvider;
//!
//! let provider = OllamaProvider::new("http://localhost:11434", "qwen2.5:7b").unwrap();
//! let text = provider.generate("Say 'hello' and nothing else").unwrap();
//! ```

use crate::LlmError;
use chunkwise_domain::traits::LlmProvider as LlmProviderTrait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default HTTP timeout for one request (5 minutes)
///
/// Local models can be slow; the extractor applies its own per-chunk deadline.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default number of attempts per request
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Ollama API provider for local LLM inference
///
/// This provider communicates with a local Ollama instance to generate text.
#[derive(Debug)]
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    client: reqwest::blocking::Client,
    max_retries: u32,
    max_tokens: Option<u32>,
}

/// Request body for Ollama generate API
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a Value>,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Response from Ollama generate API
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
    #[allow(dead_code)]
    done: bool,
}

#[derive(Deserialize)]
struct OllamaErrorResponse {
    error: String,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://localhost:11434")
    /// - `model`: Model to use (e.g., "qwen2.5:7b", "mistral")
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Other` if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client: build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
            max_retries: DEFAULT_MAX_RETRIES,
            max_tokens: None,
        })
    }

    /// Create a new Ollama provider with default settings
    ///
    /// Uses `http://localhost:11434` as endpoint and requires a model name.
    pub fn default_endpoint(model: impl Into<String>) -> Result<Self, LlmError> {
        Self::new(DEFAULT_ENDPOINT, model)
    }

    /// Set the maximum number of attempts per request
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Cap the number of tokens the model may generate per request
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Replace the HTTP request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Result<Self, LlmError> {
        self.client = build_client(timeout)?;
        Ok(self)
    }

    /// Endpoint this provider talks to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Attempts made per request before giving up
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn send(&self, prompt: &str, format: Option<&Value>) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.endpoint);
        let request_body = OllamaGenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format,
            options: OllamaOptions {
                temperature: 0.0,
                num_predict: self.max_tokens,
            },
        };

        // Retry logic with exponential backoff
        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.max_retries {
            debug!(model = %self.model, attempt = attempts + 1, "Sending generate request");
            match self.client.post(&url).json(&request_body).send() {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json::<OllamaGenerateResponse>()
                            .map(|r| r.response)
                            .map_err(|e| {
                                LlmError::InvalidResponse(format!("Failed to parse response: {}", e))
                            });
                    }

                    let error_text = response
                        .text()
                        .map(|body| error_message(&body))
                        .unwrap_or_else(|_| "Unknown error".to_string());

                    match classify_status(status, &self.model, &error_text) {
                        Some(fatal) => return Err(fatal),
                        None => {
                            last_error = Some(if status == StatusCode::TOO_MANY_REQUESTS {
                                LlmError::RateLimitExceeded
                            } else {
                                LlmError::Communication(format!("HTTP {}: {}", status, error_text))
                            });
                        }
                    }
                }
                // The request timeout already spent the caller's whole budget
                Err(e) if e.is_timeout() => {
                    return Err(LlmError::Timeout(format!("Request timed out: {}", e)));
                }
                Err(e) => {
                    last_error = Some(LlmError::Communication(format!("Request failed: {}", e)));
                }
            }

            attempts += 1;
            if attempts < self.max_retries {
                // Exponential backoff: 1s, 2s, 4s, etc.
                let delay = Duration::from_secs(2u64.pow(attempts - 1));
                warn!(attempt = attempts, delay_secs = delay.as_secs(), "Ollama request failed, retrying");
                std::thread::sleep(delay);
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::Communication("Max retries exceeded".to_string())))
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::blocking::Client, LlmError> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::Other(format!("Failed to build HTTP client: {}", e)))
}

/// Pull the `error` field out of an Ollama error body, falling back to the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<OllamaErrorResponse>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.trim().to_string())
}

/// Map a non-success status to an error that must not be retried
///
/// Returns `None` for statuses worth another attempt (429 and 5xx).
fn classify_status(status: StatusCode, model: &str, error_text: &str) -> Option<LlmError> {
    if status == StatusCode::NOT_FOUND {
        return Some(LlmError::ModelNotAvailable(model.to_string()));
    }
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        if is_context_error(error_text) {
            return Some(LlmError::ContextLengthExceeded(error_text.to_string()));
        }
        return None;
    }
    if is_context_error(error_text) {
        return Some(LlmError::ContextLengthExceeded(error_text.to_string()));
    }
    Some(LlmError::Other(format!("HTTP {}: {}", status, error_text)))
}

fn is_context_error(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("context length") || lower.contains("context window") || lower.contains("too long")
}

impl LlmProviderTrait for OllamaProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        self.send(prompt, None)
    }

    fn generate_structured(&self, prompt: &str, schema: &str) -> Result<String, Self::Error> {
        let format: Value = serde_json::from_str(schema)
            .map_err(|e| LlmError::Other(format!("Schema is not valid JSON: {}", e)))?;
        self.send(prompt, Some(&format))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
