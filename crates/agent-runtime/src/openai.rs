//! OpenAI-Compatible LLM Provider
//!
//! Implementation of `LlmProvider` for chat-completions endpoints. Supports
//! the standard OpenAI wire format (`Authorization: Bearer`) and Azure OpenAI
//! deployments (`api-key` header plus `api-version` query parameter).

use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{Completion, FinishReason, GenerationOptions, LlmProvider, TokenUsage},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Which dialect of the chat-completions API to speak
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiFlavor {
    /// Standard OpenAI-compatible endpoint (`{base}/chat/completions`)
    OpenAi,
    /// Azure deployment endpoint
    /// (`{base}/openai/deployments/{deployment}/chat/completions?api-version=...`)
    Azure {
        deployment: String,
        api_version: String,
    },
}

/// Provider configuration
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// Endpoint base URL (no trailing slash)
    pub api_base: String,

    /// API key
    pub api_key: String,

    /// API dialect
    pub flavor: ApiFlavor,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    /// Build from environment variables.
    ///
    /// Prefers the Azure variable set the original deployment uses
    /// (`AZURE_OPENAI_ENDPOINT`, `AZURE_OPENAI_API_KEY`,
    /// `AZURE_OPENAI_DEPLOYMENT`, `AZURE_OPENAI_API_VERSION`); falls back to
    /// `OPENAI_API_BASE` + `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        if let Ok(endpoint) = std::env::var("AZURE_OPENAI_ENDPOINT") {
            let api_key = std::env::var("AZURE_OPENAI_API_KEY")
                .map_err(|_| AgentError::Config("AZURE_OPENAI_API_KEY not set".into()))?;
            let deployment = std::env::var("AZURE_OPENAI_DEPLOYMENT")
                .map_err(|_| AgentError::Config("AZURE_OPENAI_DEPLOYMENT not set".into()))?;
            let api_version = std::env::var("AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|_| "2024-06-01".into());

            return Ok(Self {
                api_base: endpoint.trim_end_matches('/').to_string(),
                api_key,
                flavor: ApiFlavor::Azure {
                    deployment,
                    api_version,
                },
                timeout_secs: default_timeout_secs(),
            });
        }

        let api_base = std::env::var("OPENAI_API_BASE")
            .unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| AgentError::Config("OPENAI_API_KEY not set".into()))?;

        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            flavor: ApiFlavor::OpenAi,
            timeout_secs: default_timeout_secs(),
        })
    }
}

fn default_timeout_secs() -> u64 {
    std::env::var("OPENAI_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(60)
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Deserialize)]
struct WireError {
    error: WireErrorBody,
}

#[derive(Deserialize)]
struct WireErrorBody {
    message: String,
}

// ============================================================================
// Provider
// ============================================================================

/// OpenAI-compatible chat-completions provider
pub struct OpenAiProvider {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    /// Create from configuration
    pub fn from_config(config: OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(OpenAiConfig::from_env()?)
    }

    fn completions_url(&self, model: &str) -> String {
        match &self.config.flavor {
            ApiFlavor::OpenAi => format!("{}/chat/completions", self.config.api_base),
            ApiFlavor::Azure {
                deployment,
                api_version,
            } => {
                // Azure ignores the body model field; the deployment wins
                let _ = model;
                format!(
                    "{}/openai/deployments/{}/chat/completions?api-version={}",
                    self.config.api_base, deployment, api_version
                )
            }
        }
    }

    fn auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.flavor {
            ApiFlavor::OpenAi => request.bearer_auth(&self.config.api_key),
            ApiFlavor::Azure { .. } => request.header("api-key", &self.config.api_key),
        }
    }

    fn wire_role(role: &Role) -> &'static str {
        match role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            // Tool results ride along as user context; the reasoning loop
            // already tagged them in the message text.
            Role::Tool => "user",
        }
    }

    fn convert_messages(messages: &[Message]) -> Vec<WireMessage<'_>> {
        messages
            .iter()
            .map(|m| WireMessage {
                role: Self::wire_role(&m.role),
                content: &m.content,
            })
            .collect()
    }

    fn convert_finish_reason(reason: Option<&str>) -> Option<FinishReason> {
        match reason {
            Some("stop") => Some(FinishReason::Stop),
            Some("length") => Some(FinishReason::Length),
            Some("tool_calls" | "function_call") => Some(FinishReason::ToolUse),
            Some("content_filter") => Some(FinishReason::ContentFilter),
            Some(_) => Some(FinishReason::Error),
            None => None,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        match self.config.flavor {
            ApiFlavor::OpenAi => "openai",
            ApiFlavor::Azure { .. } => "azure-openai",
        }
    }

    async fn health_check(&self) -> Result<bool> {
        // A cheap unauthenticated reachability probe; a 4xx still proves the
        // endpoint resolves and answers.
        let url = self.completions_url("health");
        match self.client.get(&url).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!(provider = self.name(), error = %e, "health check failed");
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let body = ChatCompletionRequest {
            model: &options.model,
            messages: Self::convert_messages(messages),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            top_p: options.top_p,
            stop: options.stop_sequences.clone(),
        };

        let url = self.completions_url(&options.model);
        let response = self
            .auth(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    AgentError::ProviderUnavailable(e.to_string())
                } else {
                    AgentError::Provider(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<WireError>(&text)
                .map_or(text, |e| e.error.message);
            return Err(AgentError::Provider(format!("{status}: {detail}")));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Parse(format!("completion response: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Provider("empty choices in response".into()))?;

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            model: parsed.model.unwrap_or_else(|| options.model.clone()),
            usage: parsed.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: Self::convert_finish_reason(choice.finish_reason.as_deref()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn azure_config() -> OpenAiConfig {
        OpenAiConfig {
            api_base: "https://example.openai.azure.com".into(),
            api_key: "k".into(),
            flavor: ApiFlavor::Azure {
                deployment: "gpt-4o".into(),
                api_version: "2024-06-01".into(),
            },
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_azure_url_shape() {
        let provider = OpenAiProvider::from_config(azure_config()).unwrap();
        let url = provider.completions_url("ignored");
        assert_eq!(
            url,
            "https://example.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-06-01"
        );
    }

    #[test]
    fn test_openai_url_shape() {
        let provider = OpenAiProvider::from_config(OpenAiConfig {
            api_base: "https://api.openai.com/v1".into(),
            api_key: "k".into(),
            flavor: ApiFlavor::OpenAi,
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(
            provider.completions_url("gpt-4o-mini"),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{
            "model": "gpt-4o-mini",
            "choices": [{"message": {"role": "assistant", "content": "hi"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
        }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("hi"));
        assert_eq!(parsed.usage.as_ref().unwrap().total_tokens, 12);
    }
}
