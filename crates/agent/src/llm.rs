use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::warn;

use campusdesk_core::config::{LlmConfig, LlmProvider};
use campusdesk_core::domain::session::SessionContext;
use campusdesk_core::errors::FailureClass;

use crate::tools::ToolSpec;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// JSON-encoded argument object as produced by the model.
    pub arguments: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatMessage {
    System(String),
    User(String),
    Assistant { text: Option<String>, tool_calls: Vec<ToolCall> },
    ToolResult { call_id: String, content: String },
}

#[derive(Clone, Debug)]
pub struct ModelRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSpec>,
    pub session: SessionContext,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModelReply {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("model service unavailable: {0}")]
    Unavailable(String),
    #[error("model service throttled the request: {0}")]
    Throttled(String),
    #[error("model call timed out after {0}s")]
    Timeout(u64),
    #[error("model refused the request (content filter)")]
    ContentFiltered,
    #[error("malformed model exchange: {0}")]
    Malformed(String),
}

impl ModelError {
    pub fn class(&self) -> FailureClass {
        match self {
            Self::Unavailable(_) | Self::Throttled(_) | Self::Timeout(_) => FailureClass::Retryable,
            Self::ContentFiltered | Self::Malformed(_) => FailureClass::NonRetryable,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class().is_retryable()
    }
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn converse(&self, request: &ModelRequest) -> Result<ModelReply, ModelError>;
}

/// Per-attempt timeout plus bounded exponential backoff for retryable failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub attempt_timeout: Duration,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            attempt_timeout: Duration::from_secs(config.timeout_secs),
            base_delay: Duration::from_millis(250),
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2_u32.saturating_pow(attempt))
    }
}

pub async fn converse_with_retry(
    client: &dyn ModelClient,
    request: &ModelRequest,
    policy: RetryPolicy,
) -> Result<ModelReply, ModelError> {
    let mut attempt = 0;
    loop {
        let outcome = match tokio::time::timeout(policy.attempt_timeout, client.converse(request))
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(ModelError::Timeout(policy.attempt_timeout.as_secs())),
        };

        match outcome {
            Err(error) if error.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                warn!(
                    event_name = "model.retry",
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "retrying model call"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Client for `/v1/chat/completions` with function tools, as served by
/// OpenAI and by Ollama's compatibility endpoint.
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
    model: String,
    temperature: f32,
    timeout_secs: u64,
}

impl OpenAiCompatibleClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, ModelError> {
        let default_base = match config.provider {
            LlmProvider::OpenAi => DEFAULT_OPENAI_BASE_URL,
            LlmProvider::Ollama => DEFAULT_OLLAMA_BASE_URL,
        };
        let base_url = config.base_url.as_deref().unwrap_or(default_base).trim_end_matches('/');
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| ModelError::Unavailable(format!("http client: {error}")))?;

        Ok(Self {
            http,
            endpoint: format!("{base_url}/v1/chat/completions"),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_body(&self, request: &ModelRequest) -> Value {
        let messages: Vec<Value> = request.messages.iter().map(wire_message).collect();
        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "user": format!("{}:{}", request.session.actor_id, request.session.session_id),
        });

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|spec| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": spec.name,
                            "description": spec.description,
                            "parameters": spec.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(tools);
            body["tool_choice"] = json!("auto");
        }

        body
    }
}

fn wire_message(message: &ChatMessage) -> Value {
    match message {
        ChatMessage::System(text) => json!({ "role": "system", "content": text }),
        ChatMessage::User(text) => json!({ "role": "user", "content": text }),
        ChatMessage::Assistant { text, tool_calls } => {
            let mut value = json!({ "role": "assistant", "content": text });
            if !tool_calls.is_empty() {
                value["tool_calls"] = Value::Array(
                    tool_calls
                        .iter()
                        .map(|call| {
                            json!({
                                "id": call.id,
                                "type": "function",
                                "function": { "name": call.name, "arguments": call.arguments },
                            })
                        })
                        .collect(),
                );
            }
            value
        }
        ChatMessage::ToolResult { call_id, content } => {
            json!({ "role": "tool", "tool_call_id": call_id, "content": content })
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

fn map_status(status: StatusCode, body: &str) -> ModelError {
    let snippet: String = body.chars().take(200).collect();
    if status == StatusCode::TOO_MANY_REQUESTS {
        ModelError::Throttled(snippet)
    } else if status.is_server_error() {
        ModelError::Unavailable(format!("{status}: {snippet}"))
    } else if body.contains("content_filter") || body.contains("content_policy") {
        ModelError::ContentFiltered
    } else {
        ModelError::Malformed(format!("{status}: {snippet}"))
    }
}

fn parse_reply(response: CompletionResponse) -> Result<ModelReply, ModelError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ModelError::Malformed("response has no choices".to_string()))?;

    if choice.finish_reason.as_deref() == Some("content_filter") {
        return Err(ModelError::ContentFiltered);
    }

    let tool_calls = choice
        .message
        .tool_calls
        .into_iter()
        .map(|call| ToolCall {
            id: call.id,
            name: call.function.name,
            // Ollama sends arguments as an object, OpenAI as a JSON string.
            arguments: match call.function.arguments {
                Value::String(encoded) => encoded,
                Value::Null => "{}".to_string(),
                other => other.to_string(),
            },
        })
        .collect();
    let text = choice.message.content.filter(|text| !text.trim().is_empty());

    Ok(ModelReply { text, tool_calls })
}

#[async_trait]
impl ModelClient for OpenAiCompatibleClient {
    async fn converse(&self, request: &ModelRequest) -> Result<ModelReply, ModelError> {
        let mut builder = self.http.post(&self.endpoint).json(&self.build_body(request));
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }

        let response = builder.send().await.map_err(|error| {
            if error.is_timeout() {
                ModelError::Timeout(self.timeout_secs)
            } else {
                ModelError::Unavailable(error.to_string())
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            if error.is_timeout() {
                ModelError::Timeout(self.timeout_secs)
            } else {
                ModelError::Unavailable(error.to_string())
            }
        })?;
        if !status.is_success() {
            return Err(map_status(status, &body));
        }

        let parsed: CompletionResponse = serde_json::from_str(&body)
            .map_err(|error| ModelError::Malformed(format!("invalid completion body: {error}")))?;
        parse_reply(parsed)
    }
}
