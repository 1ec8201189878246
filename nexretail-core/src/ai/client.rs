//! AI Client Module
//!
//! Handles communication with the generative-language API.

use log::debug;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::config::{api_key_from_env, Config};

/// Errors that can occur during AI operations
#[derive(Error, Debug)]
pub enum AiError {
    #[error("API key missing")]
    ApiKeyMissing,

    #[error("API request failed: {0}")]
    ApiRequestFailed(String),

    #[error("Invalid response from AI: {0}")]
    InvalidResponse(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("AI integration not available")]
    NotAvailable,
}

/// Anything that can turn a prompt into generated text
///
/// The production implementation is [`AiClient`]; tests substitute fakes.
pub trait ReasoningService: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, AiError>;
}

/// AI operation mode
#[derive(Clone, Default)]
pub enum AiMode {
    /// Gemini `generateContent` with an API key
    Gemini { api_key: String },
    /// AI features disabled
    #[default]
    Disabled,
}

impl fmt::Debug for AiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AiMode::Gemini { .. } => f.write_str("Gemini { api_key: <redacted> }"),
            AiMode::Disabled => f.write_str("Disabled"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, parts concatenated
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// AI Client for the generative-language API
#[derive(Debug, Clone)]
pub struct AiClient {
    mode: AiMode,
    model: String,
    base_url: String,
    http: Client,
}

impl AiClient {
    /// Create a client configured from settings, with the key taken from the environment
    pub fn from_config(config: &Config) -> Self {
        let mode = match api_key_from_env() {
            Some(api_key) => AiMode::Gemini { api_key },
            None => AiMode::Disabled,
        };
        Self::with_mode(mode, config)
    }

    /// Create a client with a specific mode
    pub fn with_mode(mode: AiMode, config: &Config) -> Self {
        Self {
            mode,
            model: config.model.clone(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            http: Self::build_http(config.request_timeout()),
        }
    }

    fn build_http(timeout: Option<Duration>) -> Client {
        Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                debug!("Falling back to default HTTP client: {}", e);
                Client::new()
            })
    }

    /// Check if AI features are available
    pub fn is_available(&self) -> bool {
        match &self.mode {
            AiMode::Gemini { api_key } => !api_key.is_empty(),
            AiMode::Disabled => false,
        }
    }

    /// Get the current mode
    pub fn mode(&self) -> &AiMode {
        &self.mode
    }

    /// Get a description of the current mode
    pub fn mode_description(&self) -> String {
        match &self.mode {
            AiMode::Gemini { .. } => format!("Gemini ({})", self.model),
            AiMode::Disabled => "Disabled".to_string(),
        }
    }

    /// URL of the generateContent endpoint for the configured model
    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Send request to the Gemini API
    fn send_gemini_request(&self, api_key: &str, prompt: &str) -> Result<String, AiError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .map_err(|e| AiError::ApiRequestFailed(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AiError::RateLimited);
        }
        if !status.is_success() {
            let detail: String = response.text().unwrap_or_default().chars().take(200).collect();
            return Err(AiError::ApiRequestFailed(format!("HTTP {}: {}", status, detail)));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .map_err(|e| AiError::InvalidResponse(e.to_string()))?;

        Ok(parsed.text())
    }
}

impl ReasoningService for AiClient {
    fn generate(&self, prompt: &str) -> Result<String, AiError> {
        match &self.mode {
            AiMode::Gemini { api_key } if !api_key.is_empty() => {
                self.send_gemini_request(api_key, prompt)
            }
            AiMode::Gemini { .. } => Err(AiError::ApiKeyMissing),
            AiMode::Disabled => Err(AiError::ApiKeyMissing),
        }
    }
}
