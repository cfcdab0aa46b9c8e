use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use glowie_core::config::{LlmConfig, LlmProvider};
use glowie_core::{ChatRole, ChatTurn};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// What gets sent to the model: a bare prompt or a role-tagged conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Prompt {
    Text(String),
    Messages(Vec<ChatTurn>),
}

impl Prompt {
    pub fn into_messages(self) -> Vec<ChatTurn> {
        match self {
            Self::Text(content) => vec![ChatTurn { role: ChatRole::User, content }],
            Self::Messages(messages) => messages,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub prompt: Prompt,
    /// Overrides the configured sampling temperature for this call.
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self { prompt: Prompt::Text(prompt.into()), temperature: None }
    }

    pub fn messages(messages: Vec<ChatTurn>) -> Self {
        Self { prompt: Prompt::Messages(messages), temperature: None }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("completion provider unavailable: {0}")]
    Unavailable(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("completion request timed out after {secs}s")]
    Timeout { secs: u64 },
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("rate limited by completion provider")]
    RateLimited,
    #[error("provider returned status {status}: {message}")]
    Api { status: u16, message: String },
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError>;
}

/// Client for any endpoint speaking the OpenAI `/chat/completions` dialect
/// (Mistral, OpenAI, Ollama).
pub struct OpenAiCompatClient {
    provider: LlmProvider,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
    temperature: f32,
    timeout_secs: u64,
    client: Client,
}

impl OpenAiCompatClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| ProviderError::Unavailable(error.to_string()))?;

        Ok(Self {
            provider: config.provider,
            base_url: config.effective_base_url().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn request_body(&self, request: CompletionRequest) -> ChatCompletionBody {
        ChatCompletionBody {
            model: self.model.clone(),
            temperature: request.temperature.unwrap_or(self.temperature),
            messages: request
                .prompt
                .into_messages()
                .into_iter()
                .map(|turn| ApiMessage { role: turn.role, content: turn.content })
                .collect(),
            stream: false,
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompatClient {
    fn name(&self) -> &str {
        self.provider.as_str()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let body = self.request_body(request);
        debug!(
            event_name = "llm.request.started",
            provider = self.provider.as_str(),
            model = %self.model,
            "sending completion request"
        );

        let mut builder = self.client.post(self.endpoint()).json(&body);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }

        let response = builder.send().await.map_err(|error| {
            if error.is_timeout() {
                ProviderError::Timeout { secs: self.timeout_secs }
            } else {
                ProviderError::Network(error.to_string())
            }
        })?;

        let status = response.status().as_u16();
        match status {
            200..=299 => {}
            401 | 403 => {
                return Err(ProviderError::Authentication(
                    "invalid API key or insufficient permissions".to_string(),
                ))
            }
            429 => return Err(ProviderError::RateLimited),
            _ => {
                let message = response.text().await.unwrap_or_default();
                warn!(
                    event_name = "llm.request.failed",
                    provider = self.provider.as_str(),
                    status,
                    "completion provider returned an error status"
                );
                return Err(ProviderError::Api { status, message });
            }
        }

        let payload: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|error| ProviderError::InvalidResponse(error.to_string()))?;

        payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::InvalidResponse("no choices in response".to_string()))
    }
}

/// Stand-in used when no provider is configured. Every call fails, which
/// routes callers onto their deterministic fallback.
#[derive(Clone, Debug, Default)]
pub struct OfflineCompletionClient;

#[async_trait]
impl CompletionClient for OfflineCompletionClient {
    fn name(&self) -> &str {
        "offline"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<String, ProviderError> {
        Err(ProviderError::Unavailable("completion provider is offline".to_string()))
    }
}

/// Replays queued replies in order and records every request it receives.
/// Once the script is exhausted each call reports the provider as unavailable.
#[derive(Debug, Default)]
pub struct ScriptedCompletionClient {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletionClient {
    pub fn new(replies: impl IntoIterator<Item = Result<String, ProviderError>>) -> Self {
        Self { replies: Mutex::new(replies.into_iter().collect()), requests: Mutex::default() }
    }

    pub fn replying(reply: impl Into<String>) -> Self {
        Self::new([Ok(reply.into())])
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new([Err(error)])
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletionClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        match self.requests.lock() {
            Ok(mut requests) => requests.push(request),
            Err(poisoned) => poisoned.into_inner().push(request),
        }

        let next = match self.replies.lock() {
            Ok(mut replies) => replies.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        next.unwrap_or_else(|| Err(ProviderError::Unavailable("script exhausted".to_string())))
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody {
    model: String,
    temperature: f32,
    messages: Vec<ApiMessage>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: ChatRole,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ApiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use glowie_core::config::{LlmConfig, LlmProvider};
    use glowie_core::{ChatRole, ChatTurn};

    use super::{
        CompletionClient, CompletionRequest, OfflineCompletionClient, OpenAiCompatClient, Prompt,
        ProviderError, ScriptedCompletionClient,
    };

    fn llm_config(provider: LlmProvider, base_url: Option<&str>) -> LlmConfig {
        LlmConfig {
            provider,
            api_key: None,
            base_url: base_url.map(str::to_string),
            model: "mistral-large-latest".to_string(),
            temperature: 0.7,
            timeout_secs: 5,
        }
    }

    #[test]
    fn text_prompt_becomes_single_user_message() {
        let messages = Prompt::Text("hello".to_string()).into_messages();
        assert_eq!(messages, vec![ChatTurn { role: ChatRole::User, content: "hello".to_string() }]);
    }

    #[test]
    fn endpoint_uses_provider_default_and_trims_trailing_slash() {
        let mistral = OpenAiCompatClient::from_config(&llm_config(LlmProvider::Mistral, None))
            .expect("client");
        assert_eq!(mistral.endpoint(), "https://api.mistral.ai/v1/chat/completions");
        assert_eq!(mistral.name(), "mistral");

        let ollama = OpenAiCompatClient::from_config(&llm_config(
            LlmProvider::Ollama,
            Some("http://127.0.0.1:11434/v1/"),
        ))
        .expect("client");
        assert_eq!(ollama.endpoint(), "http://127.0.0.1:11434/v1/chat/completions");
    }

    #[test]
    fn request_body_carries_role_tags_and_temperature_override() {
        let client = OpenAiCompatClient::from_config(&llm_config(LlmProvider::Mistral, None))
            .expect("client");
        let body = client.request_body(
            CompletionRequest::messages(vec![
                ChatTurn { role: ChatRole::System, content: "rules".to_string() },
                ChatTurn { role: ChatRole::User, content: "doc".to_string() },
            ])
            .with_temperature(0.3),
        );

        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["model"], "mistral-large-latest");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "doc");
        assert!((json["temperature"].as_f64().unwrap_or_default() - 0.3).abs() < 1e-6);
    }

    #[tokio::test]
    async fn offline_client_always_reports_unavailable() {
        let result = OfflineCompletionClient.complete(CompletionRequest::text("hi")).await;
        assert!(matches!(result, Err(ProviderError::Unavailable(_))));
    }

    #[tokio::test]
    async fn scripted_client_replays_then_runs_dry() {
        let client = ScriptedCompletionClient::new([
            Ok("first".to_string()),
            Err(ProviderError::RateLimited),
        ]);

        assert_eq!(client.complete(CompletionRequest::text("a")).await, Ok("first".to_string()));
        assert_eq!(
            client.complete(CompletionRequest::text("b")).await,
            Err(ProviderError::RateLimited)
        );
        assert!(matches!(
            client.complete(CompletionRequest::text("c")).await,
            Err(ProviderError::Unavailable(_))
        ));
        assert_eq!(client.requests().len(), 3);
    }
}
