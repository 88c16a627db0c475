//! Chat-completions judgment oracle.
//!
//! Posts the control prompt to an OpenAI-compatible `/chat/completions`
//! endpoint in JSON mode and hands the decoded message content back to the
//! adapter for validation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{JudgmentFailure, JudgmentOracle, JudgmentRequest, JudgmentResult};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Maximum response body kept in an HTTP error.
const ERROR_BODY_LIMIT: usize = 512;

/// HTTP oracle configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiOracleConfig {
    /// API root, without the trailing `/chat/completions`.
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
}

impl Default for OpenAiOracleConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("READINESS_ORACLE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            model: std::env::var("READINESS_ORACLE_MODEL")
                .unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl OpenAiOracleConfig {
    /// Configuration from environment variables, with defaults.
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Configuration for a specific endpoint, ignoring the environment.
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: None,
            model: model.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Judgment oracle backed by a chat-completions HTTP API.
#[derive(Debug, Clone)]
pub struct OpenAiOracle {
    config: OpenAiOracleConfig,
    http_client: reqwest::Client,
}

impl OpenAiOracle {
    pub fn new(config: OpenAiOracleConfig) -> JudgmentResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("readiness-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| JudgmentFailure::Transport(e.to_string()))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn from_env() -> JudgmentResult<Self> {
        Self::new(OpenAiOracleConfig::from_env())
    }

    pub fn config(&self) -> &OpenAiOracleConfig {
        &self.config
    }
}

#[async_trait]
impl JudgmentOracle for OpenAiOracle {
    async fn judge(&self, request: &JudgmentRequest) -> JudgmentResult<Value> {
        let body = json!({
            "model": self.config.model,
            "messages": [{ "role": "user", "content": request.prompt() }],
            "temperature": self.config.temperature,
            "response_format": { "type": "json_object" },
        });

        let mut http = self.http_client.post(self.config.completions_url()).json(&body);
        if let Some(key) = &self.config.api_key {
            http = http.bearer_auth(key);
        }

        let response = http
            .send()
            .await
            .map_err(|e| JudgmentFailure::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let mut text = response.text().await.unwrap_or_default();
            let cut = text
                .char_indices()
                .nth(ERROR_BODY_LIMIT)
                .map_or(text.len(), |(i, _)| i);
            text.truncate(cut);
            warn!(control_id = %request.control_id, status = status.as_u16(), "oracle HTTP error");
            return Err(JudgmentFailure::HttpStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| JudgmentFailure::Protocol(format!("invalid completion body: {e}")))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| JudgmentFailure::Protocol("completion has no content".to_string()))?;

        debug!(control_id = %request.control_id, chars = content.len(), "oracle answered");
        serde_json::from_str(&content)
            .map_err(|e| JudgmentFailure::Protocol(format!("content is not JSON: {e}")))
    }
}
