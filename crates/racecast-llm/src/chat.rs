//! OpenAI-compatible chat-completions plan provider.
//!
//! One client covers both hosted OpenAI and local OpenAI-compatible servers
//! (Ollama and friends); they share the same wire format and differ only in
//! endpoint and auth.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use racecast_models::{CameraPlan, RaceSummary};

use crate::error::{LlmError, LlmResult};
use crate::prompt;
use crate::provider::PlanProvider;

const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Configuration for the chat plan provider.
#[derive(Debug, Clone)]
pub struct ChatProviderConfig {
    /// Chat-completions endpoint URL
    pub endpoint: String,
    /// Bearer token; `None` for local servers that need no auth
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Request timeout
    pub timeout: Duration,
}

impl ChatProviderConfig {
    /// Hosted OpenAI configuration.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: OPENAI_ENDPOINT.to_string(),
            api_key: Some(api_key.into()),
            model: model.into(),
            temperature: 0.7,
            max_tokens: 4096,
            timeout: Duration::from_secs(120),
        }
    }

    /// Local OpenAI-compatible server configuration (no auth).
    pub fn local(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            model: model.into(),
            temperature: 0.7,
            max_tokens: 4096,
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Plan provider speaking the OpenAI chat-completions wire format.
pub struct ChatPlanProvider {
    name: &'static str,
    requires_api_key: bool,
    config: ChatProviderConfig,
    http: Client,
    last_error: Mutex<Option<String>>,
}

impl ChatPlanProvider {
    /// Hosted OpenAI provider.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> LlmResult<Self> {
        Self::build("OpenAI", true, ChatProviderConfig::openai(api_key, model))
    }

    /// Local OpenAI-compatible provider.
    pub fn local(endpoint: impl Into<String>, model: impl Into<String>) -> LlmResult<Self> {
        Self::build(
            "Local Model",
            false,
            ChatProviderConfig::local(endpoint, model),
        )
    }

    fn build(
        name: &'static str,
        requires_api_key: bool,
        config: ChatProviderConfig,
    ) -> LlmResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(LlmError::Network)?;

        Ok(Self {
            name,
            requires_api_key,
            config,
            http,
            last_error: Mutex::new(None),
        })
    }

    fn record_error(&self, error: &LlmError) {
        *self.last_error.lock().unwrap() = Some(error.to_string());
    }

    async fn post_chat(&self, request: &ChatRequest<'_>) -> LlmResult<ChatResponse> {
        let mut builder = self.http.post(&self.config.endpoint).json(request);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }

        Ok(response.json().await?)
    }

    async fn request_plan(&self, summary: &RaceSummary) -> LlmResult<CameraPlan> {
        if !self.is_configured() {
            return Err(LlmError::NotConfigured);
        }

        let user_prompt = prompt::build_user_prompt(summary);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage { role: "system", content: prompt::SYSTEM_PROMPT },
                ChatMessage { role: "user", content: &user_prompt },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!(model = %self.config.model, "requesting camera plan");
        let response = self.post_chat(&request).await?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| LlmError::Parse("empty response from model".to_string()))?;

        let mut plan: CameraPlan = serde_json::from_str(extract_json(content))
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        plan.generated_by = format!("{} ({})", self.name, self.config.model);
        plan.generated_at = Some(Utc::now());
        plan.total_duration_frames = summary.total_frames();

        info!(
            actions = plan.actions.len(),
            model = %self.config.model,
            "received camera plan"
        );
        Ok(plan)
    }
}

#[async_trait]
impl PlanProvider for ChatPlanProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn is_configured(&self) -> bool {
        if self.config.endpoint.trim().is_empty() || self.config.model.trim().is_empty() {
            return false;
        }
        if self.requires_api_key {
            return self
                .config
                .api_key
                .as_deref()
                .is_some_and(|key| !key.trim().is_empty());
        }
        true
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap().clone()
    }

    async fn generate_plan(&self, summary: &RaceSummary) -> LlmResult<CameraPlan> {
        match self.request_plan(summary).await {
            Ok(plan) => Ok(plan),
            Err(error) => {
                warn!(provider = self.name, %error, "plan generation failed");
                self.record_error(&error);
                Err(error)
            }
        }
    }

    async fn test_connection(&self) -> bool {
        if !self.is_configured() {
            return false;
        }

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: "Say 'OK' if you can read this.",
            }],
            temperature: 0.0,
            max_tokens: 10,
        };

        match self.post_chat(&request).await {
            Ok(_) => true,
            Err(error) => {
                self.record_error(&error);
                false
            }
        }
    }
}

/// Strip markdown code fences and trim to the outermost JSON object.
fn extract_json(content: &str) -> &str {
    let mut content = content.trim();

    if let Some(stripped) = content.strip_prefix("```json") {
        content = stripped;
    } else if let Some(stripped) = content.strip_prefix("```") {
        content = stripped;
    }
    if let Some(stripped) = content.strip_suffix("```") {
        content = stripped;
    }
    content = content.trim();

    if let (Some(start), Some(end)) = (content.find('{'), content.rfind('}')) {
        if end > start {
            content = &content[start..=end];
        }
    }

    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn summary() -> RaceSummary {
        RaceSummary {
            track_name: "Test Track".to_string(),
            session_type: "Race".to_string(),
            start_frame: 0,
            end_frame: 6000,
            frame_rate: 60,
            duration_minutes: 1.7,
            drivers: Vec::new(),
            cameras: Vec::new(),
            events: Vec::new(),
        }
    }

    fn chat_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    #[test]
    fn test_extract_json_plain() {
        assert_eq!(extract_json(r#"{"a": 1}"#), r#"{"a": 1}"#);
    }

    #[test]
    fn test_extract_json_fenced() {
        let content = "```json\n{\"cameraActions\": []}\n```";
        assert_eq!(extract_json(content), "{\"cameraActions\": []}");
    }

    #[test]
    fn test_extract_json_with_chatter() {
        let content = "Here is your plan:\n{\"cameraActions\": []}\nEnjoy!";
        assert_eq!(extract_json(content), "{\"cameraActions\": []}");
    }

    #[test]
    fn test_unconfigured_providers() {
        let provider = ChatPlanProvider::openai("", "gpt-4o").unwrap();
        assert!(!provider.is_configured());

        let provider = ChatPlanProvider::local("http://localhost:11434/v1/chat/completions", "")
            .unwrap();
        assert!(!provider.is_configured());

        let provider =
            ChatPlanProvider::local("http://localhost:11434/v1/chat/completions", "llama3")
                .unwrap();
        assert!(provider.is_configured());
    }

    #[tokio::test]
    async fn test_generate_plan_parses_fenced_response() {
        let server = MockServer::start().await;
        let content = "```json\n{\"cameraActions\": [\
            {\"frame\": 0, \"cameraName\": \"TV1\", \"reason\": \"opening\"},\
            {\"frame\": 1200, \"cameraName\": \"Chase\", \"reason\": \"battle\"}\
        ]}\n```";
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(content)))
            .mount(&server)
            .await;

        let provider = ChatPlanProvider::local(
            format!("{}/v1/chat/completions", server.uri()),
            "test-model",
        )
        .unwrap();

        let plan = provider.generate_plan(&summary()).await.unwrap();
        assert_eq!(plan.actions.len(), 2);
        assert_eq!(plan.actions[1].camera, "Chase");
        assert_eq!(plan.generated_by, "Local Model (test-model)");
        assert_eq!(plan.total_duration_frames, 6000);
        assert!(provider.last_error().is_none());
    }

    #[tokio::test]
    async fn test_api_error_is_recorded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let provider = ChatPlanProvider::local(
            format!("{}/v1/chat/completions", server.uri()),
            "test-model",
        )
        .unwrap();

        let error = provider.generate_plan(&summary()).await.unwrap_err();
        assert!(matches!(error, LlmError::Api { status: 429, .. }));
        assert!(error.is_retryable());
        assert!(provider.last_error().unwrap().contains("429"));
    }

    #[tokio::test]
    async fn test_connection_probe() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("OK")))
            .mount(&server)
            .await;

        let provider = ChatPlanProvider::local(
            format!("{}/v1/chat/completions", server.uri()),
            "test-model",
        )
        .unwrap();

        assert!(provider.test_connection().await);
    }
}
